use tg_optimizer::*;
use tg_types::ClassifierFamily;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("TextGrid grid preview");

    let names: Vec<String> = std::env::args().skip(1).collect();
    let templates = if names.is_empty() {
        assemble(&PreprocessingGrid::base(), &ClassifierFamily::ALL)?
    } else {
        assemble_named(&PreprocessingGrid::base(), &names)?
    };

    let mut total = 0usize;
    for template in &templates {
        let count = template.combinations().unwrap_or(0);
        total += count;
        println!(
            "{:<30} {:<10} {:>6} candidates",
            template.classifier.to_string(),
            format!("{:?}", template.variant),
            count
        );
        for (name, values) in template.hyperparameters.iter() {
            let shown: Vec<String> = values.iter().map(ToString::to_string).collect();
            println!("    {name}: [{}]", shown.join(", "));
        }
    }

    let search = GridSearch::new(&templates)?;
    println!("{} templates, {} candidates in total", templates.len(), total);
    assert_eq!(search.len(), total);

    if let Some(first) = search.candidates().first() {
        println!("First candidate: {first}");
    }

    Ok(())
}
