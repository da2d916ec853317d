//! Policy clauses (AGB) for the knowledge base.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::llm::{GenerationParams, LanguageModel};

use super::write_output;

/// File name of the generated clauses inside the knowledge directory.
pub const POLICY_FILE_NAME: &str = "agb_regeln.txt";

pub const POLICY_PROMPT: &str = "\
[INSTRUKTION]
Du bist ein Jurist und erstellst AGB-Klauseln für eine Genossenschaftsbank.
Erstelle klare Klauseln zur Risikoklassifizierung in Bezug auf den Kauf von Gesellschaftsanteilen.
Jede Regel soll in einer eigenen Klausel formuliert werden.

Regel: Nur Kunden der Risikoklasse 1, 2 oder 3 dürfen Genossenschaftsanteile erwerben.
Kunden der Risikoklasse 4 und 5 sind vom Kauf weiterer Anteile ausgeschlossen.
Es darf keine Ausnahme gemacht werden.

Regel: Genossenschaftsanteile kosten 500€ pro Anteil. Es können nur ganze Anteile gekauft werden.

Regel: Genossenschaftsmitglieder, die vor 1990 geboren sind, dürfen maximal 10 Anteile erwerben.

Regel: Genossenschaftsmitglieder, die nach 1990 geboren sind, dürfen maximal 5 Anteile erwerben.

Formuliere eine kleine Einleitung, die die AGB-Klauseln erklärt.

[AUFGABE]
Erstelle die AGB-Klauseln basierend auf der oben genannten Regel.
";

/// Trim the reply and drop a leading title line mentioning `AGB`.
pub fn clean_policy_output(raw: &str) -> String {
    let text = raw.trim();
    let head: String = text.chars().take(50).collect();
    if head.contains("AGB") {
        match text.split_once('\n') {
            Some((_, rest)) => rest.trim().to_string(),
            None => text.to_string(),
        }
    } else {
        text.to_string()
    }
}

/// Run the `generate-policy` command and return the written path.
pub async fn run_generate_policy(config: &Config, model: &dyn LanguageModel) -> Result<PathBuf> {
    let params = GenerationParams::deterministic(config.llm.max_new_tokens);

    println!("Generating policy clauses with {}...", model.model_name());
    info!(model = model.model_name(), "requesting policy clauses");
    let raw = model
        .generate(POLICY_PROMPT, &params)
        .await
        .context("Policy generation failed")?;
    let text = clean_policy_output(&raw);

    let path = config.paths.knowledge_dir.join(POLICY_FILE_NAME);
    write_output(&path, &text)?;

    println!("--- Generated clauses ---");
    println!("{}", text);
    println!("\nClauses written to {}", path.display());
    Ok(path)
}
