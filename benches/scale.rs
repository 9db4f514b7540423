use criterion::{black_box, criterion_group, criterion_main, Criterion};
use recipe_scaler::{convert::Converter, scale, Ingredient, ScaleOptions, UnitStyle};

fn ingredients() -> Vec<Ingredient> {
    vec![
        Ingredient::new("flour", 500.0, "g"),
        Ingredient::new("water", 325.0, "ml"),
        Ingredient::new("salt", 1.5, "tsp"),
        Ingredient::new("yeast", 7.0, "grams"),
        Ingredient::new("olive oil", 2.0, "tablespoons"),
        Ingredient::new("rosemary", 1.0, "sprig"),
        Ingredient::new("eggs", 2.0, ""),
    ]
}

fn resolve(c: &mut Criterion) {
    let converter = Converter::default();
    c.bench_function("resolve factor", |b| {
        b.iter(|| {
            scale::resolve_factor(
                black_box((1.0, "liter")),
                black_box((500.0, "ml")),
                &converter,
            )
        })
    });
}

fn scale_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("scale ingredients");
    let converter = Converter::default();
    let input = black_box(ingredients());

    for style in [UnitStyle::AsWritten, UnitStyle::BestFit] {
        let options = ScaleOptions {
            unit_style: style,
            ..Default::default()
        };
        group.bench_function(format!("{style:?}"), |b| {
            b.iter(|| scale::scale_ingredients(&input, 2.5, &converter, &options))
        });
    }
}

criterion_group!(benches, resolve, scale_all);
criterion_main!(benches);
