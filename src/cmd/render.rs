use crate::cmd::GlobalArgs;
use crate::error::Result;
use crate::templates;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Template to render (defaults to [newsletter].template)
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Override or add a value, e.g. --var username=Ada
    #[arg(long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,

    /// Write the HTML here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

pub async fn render(args: RenderArgs, global: &GlobalArgs) -> Result<()> {
    let (_, settings) = global.load()?;
    let template_path = args
        .template
        .unwrap_or_else(|| settings.newsletter.template.clone());

    let mut context = templates::default_context(chrono::Utc::now(), &settings.newsletter);
    for raw in &args.vars {
        let (key, value) = templates::parse_var(raw)?;
        context.insert(key, value);
    }

    let html = templates::render_file(&template_path, &context)?;

    match args.output {
        Some(path) => {
            fs::write(&path, &html)?;
            println!(
                "{} Rendered {} to {}",
                "✓".green(),
                template_path.display(),
                path.display()
            );
        }
        None => println!("{}", html),
    }

    Ok(())
}
