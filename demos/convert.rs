use recipe_scaler::{convert::Converter, Recipe, ScaleOptions, UnitStyle};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args();
    let bin = args.next().unwrap_or_default();
    let usage = format!("Usage: {bin} <recipe.json> <key ingredient> <quantity> [unit] [--fit]");

    let path = args.next().ok_or_else(|| usage.clone())?;
    let key = args.next().ok_or_else(|| usage.clone())?;
    let quantity: f64 = args.next().ok_or_else(|| usage.clone())?.parse()?;
    let rest: Vec<String> = args.collect();
    let fit = rest.iter().any(|a| a == "--fit");
    let unit = rest
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(String::as_str)
        .unwrap_or("");

    let recipe: Recipe = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    let options = ScaleOptions {
        unit_style: if fit {
            UnitStyle::BestFit
        } else {
            UnitStyle::AsWritten
        },
        ..Default::default()
    };

    let scaled = recipe.scale_to(&key, quantity, unit, &Converter::default(), &options)?;
    println!("{} (x{})", scaled.name, scaled.factor.value());
    for ingredient in &scaled.ingredients {
        println!("  {ingredient}");
    }
    Ok(())
}
