//! Synthetic customer data.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::llm::{GenerationParams, LanguageModel};

use super::{strip_code_fence, write_output};

/// German instruction asking for `rows` customer rows plus a header line.
pub fn customer_prompt(rows: usize) -> String {
    format!(
        "Du bist ein Experte für Bankdaten und Datengenerierung.\n\
         Erstelle realistische synthetische Testdaten für ein Core-Banking-System einer Genossenschaftsbank.\n\
         Achte auf logische Konsistenz (z.B. hat ein Kind unter 18 Jahren kein Dispo-Limit).\n\
         Antworte NUR mit dem CSV-Inhalt. Keine Einleitung, kein Markdown, kein Schlusswort, keine Anführungszeichen.\n\
         \n\
         Erstelle eine synthetische CSV-Datei für Bankdaten mit {rows} Zeilen von Kundendaten.\n\
         Füge als erste Zeile die Spaltennamen hinzu.\n\
         Spalten:\n\
         Kundennummer (zufällig generiert, 8-stellig), Nachname, Vorname, Passwort (zufällig generiert, 4-stellig), \
         Geburtsdatum (YYYY-MM-DD), Kontoart (Girokonto, Sparkonto, Tagesgeld, Festgeld), IBAN (DE...),\n\
         Kontostand (2 Dezimalstellen), Dispo_Limit, Ist_Mitglied (ja/nein), Anzahl_Genossenschaftsanteile,\n\
         TAN_Verfahren (PIN, TAN, Biometrie), Risikoklasse (1, 2, 3, 4, 5).\n",
        rows = rows,
    )
}

/// Reduce the model reply to the CSV body with a trailing newline.
pub fn clean_csv_output(raw: &str) -> String {
    let body = strip_code_fence(raw);
    let mut out = body
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    out.push('\n');
    out
}

/// Run the `generate-data` command and return the written path.
pub async fn run_generate_data(
    config: &Config,
    rows: Option<usize>,
    model: &dyn LanguageModel,
) -> Result<PathBuf> {
    let rows = rows.unwrap_or(config.generator.rows);
    if rows == 0 {
        anyhow::bail!("--rows must be > 0");
    }
    let params = GenerationParams::sampled(
        config.generator.data_max_new_tokens,
        config.generator.temperature,
        config.generator.top_p,
    );

    println!("Generating {} customer rows with {}...", rows, model.model_name());
    info!(rows, model = model.model_name(), "requesting synthetic customer data");
    let raw = model
        .generate(&customer_prompt(rows), &params)
        .await
        .context("Customer data generation failed")?;
    let csv = clean_csv_output(&raw);

    println!("--- Generated CSV ---");
    print!("{}", csv);

    let path = config.paths.customers_csv.clone();
    write_output(&path, &csv)?;
    println!("\nCSV written to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_requests_row_count_and_columns() {
        let prompt = customer_prompt(12);
        assert!(prompt.contains("mit 12 Zeilen von Kundendaten"));
        for column in [
            "Kundennummer",
            "Passwort",
            "Dispo_Limit",
            "Ist_Mitglied",
            "Anzahl_Genossenschaftsanteile",
            "TAN_Verfahren",
            "Risikoklasse",
        ] {
            assert!(prompt.contains(column), "missing column {}", column);
        }
    }

    #[test]
    fn test_clean_csv_output() {
        let raw = "```csv\nKundennummer,Nachname\n\n12345678,Muster   \n```";
        assert_eq!(clean_csv_output(raw), "Kundennummer,Nachname\n12345678,Muster\n");
    }
}
