#![cfg(feature = "bundled_units")]

use indoc::indoc;
use recipe_scaler::{
    convert::{ConvertError, Converter, PhysicalQuantity, System},
    scale, Ingredient, ScaleOptions,
};
use test_case::test_case;

#[test_case(1.0, "kg", "g" => "1000 g")]
#[test_case(2.0, "cups", "ml" => "473.176 ml")]
#[test_case(1.0, "l", "cups" => "4.227 c")]
#[test_case(8.0, "oz", "g" => "226.796 g")]
#[test_case(350.0, "°F", "°C" => "176.667 °C")]
#[test_case(90.0, "min", "hours" => "1.5 h")]
fn convert(value: f64, from: &str, to: &str) -> String {
    let converter = Converter::default();
    let q = converter.parse(value, from).unwrap();
    converter.convert_quantity(&q, to).unwrap().to_string()
}

#[test_case("g" => PhysicalQuantity::Mass)]
#[test_case("tablespoons" => PhysicalQuantity::Volume)]
#[test_case("millilitre" => PhysicalQuantity::Volume)]
#[test_case("pcs" => PhysicalQuantity::Count)]
#[test_case("inch" => PhysicalQuantity::Length)]
fn recognized(unit: &str) -> PhysicalQuantity {
    Converter::default()
        .find_unit(unit)
        .unwrap()
        .physical_quantity
}

#[test_case("pinch")]
#[test_case("")]
#[test_case("clove")]
#[test_case("to taste")]
fn unrecognized(unit: &str) {
    let err = Converter::default().parse(1.0, unit).unwrap_err();
    assert!(matches!(err, ConvertError::UnknownUnit(_)));
}

#[test]
fn imperial_fit() {
    let converter = Converter::default();
    let q = converter.parse(48.0, "tsp").unwrap();
    let fitted = q.fit_to(Some(System::Imperial), &converter).unwrap();
    assert_eq!(fitted.to_string(), "1 c");
}

#[test]
fn user_layer_teaches_new_unit() {
    let converter = Converter::builder()
        .with_bundled_units()
        .unwrap()
        .with_units_toml(indoc! {r#"
            [[quantity]]
            quantity = "volume"
            [quantity.units]
            unspecified = [
                { names = ["drop", "drops"], symbols = ["dr"], ratio = 0.00005 },
            ]

            [extend.units]
            cup = { aliases = ["taza", "tazas"] }
        "#})
        .unwrap()
        .finish()
        .unwrap();

    let factor = scale::resolve_factor((1.0, "taza"), (2.0, "cups"), &converter);
    assert_eq!(factor.value(), 2.0);

    let drops = converter.parse(20.0, "drops").unwrap();
    let ml = converter.convert_quantity(&drops, "ml").unwrap();
    assert!((ml.value() - 1.0).abs() < 1e-9);

    // pinch is still unknown
    let scaled = scale::scale_ingredients(
        &[Ingredient::new("salt", 1.0, "pinch")],
        2.0,
        &converter,
        &ScaleOptions::default(),
    );
    assert_eq!(scaled[0].unit, "pinch");
}

#[test]
fn extend_symbol_precedence() {
    let converter = Converter::builder()
        .with_bundled_units()
        .unwrap()
        .with_units_toml(indoc! {r#"
            [extend]
            precedence = "before"
            [extend.units]
            cup = { symbols = ["cp"] }
        "#})
        .unwrap()
        .finish()
        .unwrap();
    assert_eq!(converter.find_unit("cups").unwrap().symbol(), "cp");
    assert_eq!(converter.find_unit("c").unwrap().symbol(), "cp");
}
