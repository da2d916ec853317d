//! Customer data models.
//!
//! A [`CustomerRecord`] is one CSV row as the data generator writes it.
//! At load time the record is split into the password (kept only by the
//! auth gate) and a [`CustomerProfile`], which has no password field and is
//! the only form that reaches the retrieval corpus.

use serde::Deserialize;

/// One row of the customer CSV. Column names are the generator's German
/// headers; unknown columns are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerRecord {
    #[serde(rename = "Kundennummer")]
    pub customer_id: String,
    #[serde(rename = "Nachname")]
    pub last_name: String,
    #[serde(rename = "Vorname")]
    pub first_name: String,
    #[serde(rename = "Passwort")]
    pub password: String,
    #[serde(rename = "Geburtsdatum", default)]
    pub birth_date: String,
    #[serde(rename = "Kontoart", default)]
    pub account_type: String,
    #[serde(rename = "IBAN", default)]
    pub iban: String,
    #[serde(rename = "Kontostand", default)]
    pub balance: String,
    #[serde(rename = "Dispo_Limit", default)]
    pub overdraft_limit: String,
    #[serde(rename = "Ist_Mitglied", default)]
    pub is_member: String,
    #[serde(rename = "Anzahl_Genossenschaftsanteile", default)]
    pub shares: String,
    #[serde(rename = "TAN_Verfahren", default)]
    pub tan_method: String,
    #[serde(rename = "Risikoklasse", default)]
    pub risk_class: String,
}

impl CustomerRecord {
    /// Split the record into its password and the password-free profile.
    pub fn into_parts(self) -> (String, CustomerProfile) {
        let profile = CustomerProfile {
            customer_id: self.customer_id,
            last_name: self.last_name,
            first_name: self.first_name,
            birth_date: self.birth_date,
            account_type: self.account_type,
            iban: self.iban,
            balance: self.balance,
            overdraft_limit: self.overdraft_limit,
            is_member: self.is_member,
            shares: self.shares,
            tan_method: self.tan_method,
            risk_class: self.risk_class,
        };
        (self.password, profile)
    }
}

/// Customer data without credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerProfile {
    pub customer_id: String,
    pub last_name: String,
    pub first_name: String,
    pub birth_date: String,
    pub account_type: String,
    pub iban: String,
    pub balance: String,
    pub overdraft_limit: String,
    pub is_member: String,
    pub shares: String,
    pub tan_method: String,
    pub risk_class: String,
}

impl CustomerProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Natural-language sentence embedded into the customer index.
    pub fn retrieval_text(&self) -> String {
        format!(
            "Kunde {} {} (Kundennummer: {}, geboren am:{}) hat ein {} mit der IBAN {}. \
             Kontostand: {} EUR. Dispo-Limit: {} EUR. \
             Genossenschaftsmitglied: {}. \
             Sicherheitsverfahren: {}. Risikoklasse: {}.",
            self.first_name,
            self.last_name,
            self.customer_id,
            self.birth_date,
            self.account_type,
            self.iban,
            self.balance,
            self.overdraft_limit,
            self.is_member,
            self.tan_method,
            self.risk_class,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CustomerRecord {
        CustomerRecord {
            customer_id: "12345678".to_string(),
            last_name: "Muster".to_string(),
            first_name: "Anna".to_string(),
            password: "4321".to_string(),
            birth_date: "1985-03-12".to_string(),
            account_type: "Girokonto".to_string(),
            iban: "DE89370400440532013000".to_string(),
            balance: "1520.35".to_string(),
            overdraft_limit: "2000".to_string(),
            is_member: "ja".to_string(),
            shares: "3".to_string(),
            tan_method: "TAN".to_string(),
            risk_class: "2".to_string(),
        }
    }

    #[test]
    fn test_retrieval_text_layout() {
        let (_, profile) = record().into_parts();
        assert_eq!(
            profile.retrieval_text(),
            "Kunde Anna Muster (Kundennummer: 12345678, geboren am:1985-03-12) \
             hat ein Girokonto mit der IBAN DE89370400440532013000. \
             Kontostand: 1520.35 EUR. Dispo-Limit: 2000 EUR. \
             Genossenschaftsmitglied: ja. Sicherheitsverfahren: TAN. Risikoklasse: 2."
        );
    }

    #[test]
    fn test_password_never_in_profile_text() {
        let mut r = record();
        r.password = "9876".to_string();
        let (password, profile) = r.into_parts();
        assert_eq!(password, "9876");
        assert!(!profile.retrieval_text().contains("9876"));
    }

    #[test]
    fn test_display_name() {
        let (_, profile) = record().into_parts();
        assert_eq!(profile.display_name(), "Anna Muster");
    }
}
