use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    constants::{EXPORT_FILE_NAME, NPI_DATA_PATH, NPI_EXPORT_CSV_PATH, NPI_FILTER_DATA_PATH},
    error::ApiError,
    http::ApiClient,
};

/// One provider row as served by the registry backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRecord {
    pub npi: String,
    #[serde(default)]
    pub enumeration_type: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub org_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default, deserialize_with = "phone_field")]
    pub phone: Option<String>,
    #[serde(default)]
    pub taxonomy: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub enumeration_date: Option<String>,
    #[serde(default)]
    pub message_sent: Option<bool>,
}

impl RegistryRecord {
    /// Organization name, else "first last", else whichever half exists.
    pub fn display_name(&self) -> String {
        let org = non_empty(self.org_name.as_deref());
        if let Some(org) = org {
            return org.to_string();
        }
        match (
            non_empty(self.first_name.as_deref()),
            non_empty(self.last_name.as_deref()),
        ) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => String::new(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Phones arrive as strings or bare numbers depending on the source table.
fn phone_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Phone {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<Phone>::deserialize(deserializer)? {
        Some(Phone::Text(s)) => Some(s),
        Some(Phone::Number(n)) => Some(n.to_string()),
        None => None,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NpiPage {
    #[serde(default)]
    pub data: Vec<RegistryRecord>,
    #[serde(default)]
    pub total: usize,
}

/// Backend-paginated query. `page` is the 1-indexed API page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: usize,
    pub limit: usize,
    pub zip: Option<String>,
    pub enumeration_type: Option<String>,
}

impl PageQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(zip) = non_empty(self.zip.as_deref()) {
            params.push(("zip", zip.to_string()));
        }
        if let Some(kind) = non_empty(self.enumeration_type.as_deref()) {
            params.push(("enumerationType", kind.to_string()));
        }
        if let Some(start) = self.start_date {
            params.push(("startDate", format_day(start)));
        }
        if let Some(end) = self.end_date {
            params.push(("endDate", format_day(end)));
        }
        params
    }
}

/// Unpaginated query used whenever a state, city or organization filter is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub state: String,
    pub city: String,
    pub organization: String,
}

impl FilterQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("startDate", self.start_date.map(format_day).unwrap_or_default()),
            ("endDate", self.end_date.map(format_day).unwrap_or_default()),
            ("state", self.state.clone()),
            ("city", self.city.clone()),
            ("organization", self.organization.clone()),
        ]
    }
}

pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

pub async fn fetch_page(client: &ApiClient, query: &PageQuery) -> Result<NpiPage, ApiError> {
    tracing::debug!(page = query.page, limit = query.limit, "fetching registry page");
    client
        .get_json(NPI_DATA_PATH, &query.params(), "Failed to fetch data.")
        .await
}

pub async fn fetch_all_filtered(
    client: &ApiClient,
    query: &FilterQuery,
) -> Result<Vec<RegistryRecord>, ApiError> {
    tracing::debug!(
        state = %query.state,
        city = %query.city,
        organization = %query.organization,
        "fetching all filtered registry rows"
    );
    client
        .get_json(NPI_FILTER_DATA_PATH, &query.params(), "Failed to fetch data.")
        .await
}

pub async fn export_csv(
    client: &ApiClient,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<Vec<u8>, ApiError> {
    let params = [
        ("startDate", start_date.map(format_day).unwrap_or_default()),
        ("endDate", end_date.map(format_day).unwrap_or_default()),
    ];
    client
        .get_bytes(NPI_EXPORT_CSV_PATH, &params, "Failed to export data.")
        .await
}

/// Writes an exported blob as `npi-data.csv` inside `output_dir`.
pub fn save_export(bytes: &[u8], output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed creating export directory {}", output_dir.display()))?;
    let output_path = output_dir.join(EXPORT_FILE_NAME);
    let tmp_path = output_dir.join(format!("{EXPORT_FILE_NAME}.tmp"));
    fs::write(&tmp_path, bytes)
        .with_context(|| format!("Failed writing {}", tmp_path.display()))?;
    fs::rename(&tmp_path, &output_path).with_context(|| {
        format!(
            "Failed moving temp export {} to {}",
            tmp_path.display(),
            output_path.display()
        )
    })?;
    Ok(output_path)
}

/// CSV of rows already held by the client, e.g. the current filtered view.
pub fn write_records_csv(rows: &[RegistryRecord], output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed creating {}", parent.display()))?;
    }

    let file_name = output_path
        .file_name()
        .and_then(|x| x.to_str())
        .unwrap_or(EXPORT_FILE_NAME);
    let tmp_path = output_path.with_file_name(format!("{file_name}.tmp"));

    let mut writer = Writer::from_path(&tmp_path)
        .with_context(|| format!("Failed creating temp CSV {}", tmp_path.display()))?;
    writer
        .write_record([
            "npi",
            "enumeration_type",
            "first_name",
            "last_name",
            "org_name",
            "city",
            "state",
            "postal_code",
            "phone",
            "taxonomy",
            "enumeration_date",
            "updated_at",
        ])
        .context("Failed writing CSV header")?;

    for row in rows {
        let field = |v: &Option<String>| v.clone().unwrap_or_default();
        writer
            .write_record([
                row.npi.clone(),
                field(&row.enumeration_type),
                field(&row.first_name),
                field(&row.last_name),
                field(&row.org_name),
                field(&row.city),
                field(&row.state),
                field(&row.postal_code),
                field(&row.phone),
                field(&row.taxonomy),
                field(&row.enumeration_date),
                field(&row.updated_at),
            ])
            .with_context(|| format!("Failed writing CSV row for {}", row.npi))?;
    }
    writer.flush().context("Failed flushing CSV writer")?;

    fs::rename(&tmp_path, output_path).with_context(|| {
        format!(
            "Failed moving temp CSV {} to {}",
            tmp_path.display(),
            output_path.display()
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accepts_numeric_phone_and_missing_fields() {
        let row: RegistryRecord = serde_json::from_str(
            r#"{"npi": "1234567890", "firstName": "Ada", "phone": 3374278230, "messageSent": true}"#,
        )
        .unwrap();
        assert_eq!(row.phone.as_deref(), Some("3374278230"));
        assert_eq!(row.message_sent, Some(true));
        assert!(row.org_name.is_none());
        assert_eq!(row.display_name(), "Ada");
    }

    #[test]
    fn display_name_prefers_organization() {
        let row = RegistryRecord {
            npi: "1".into(),
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            org_name: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(row.display_name(), "Ada Lovelace");

        let row = RegistryRecord {
            org_name: Some("Acme Clinic".into()),
            ..row
        };
        assert_eq!(row.display_name(), "Acme Clinic");
    }

    #[test]
    fn page_params_omit_empty_optional_fields() {
        let query = PageQuery {
            start_date: NaiveDate::from_ymd_opt(2025, 8, 4),
            end_date: None,
            page: 3,
            limit: 25,
            zip: Some(String::new()),
            enumeration_type: Some("NPI-2".into()),
        };
        assert_eq!(
            query.params(),
            vec![
                ("page", "3".to_string()),
                ("limit", "25".to_string()),
                ("enumerationType", "NPI-2".to_string()),
                ("startDate", "2025-08-04".to_string()),
            ]
        );
    }

    #[test]
    fn save_export_always_uses_fixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_export(b"npi\n1\n", dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "npi-data.csv");
        assert_eq!(fs::read(&path).unwrap(), b"npi\n1\n");
    }

    #[test]
    fn records_csv_has_header_and_one_line_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view.csv");
        let rows = vec![
            RegistryRecord {
                npi: "1".into(),
                city: Some("Lafayette".into()),
                ..Default::default()
            },
            RegistryRecord {
                npi: "2".into(),
                org_name: Some("Acme, Inc".into()),
                ..Default::default()
            },
        ];
        write_records_csv(&rows, &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let parsed: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(parsed.len(), 2);
        assert_eq!(&parsed[1][4], "Acme, Inc");
        assert_eq!(&parsed[0][5], "Lafayette");
    }
}
