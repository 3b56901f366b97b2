use crate::domain::model::WorkItem;
use crate::utils::error::{LookupError, Result};
use serde_json::Value;
use std::path::Path;
use url::Url;

/// 從 .txt 或 .json 檔讀取網域清單並整理成純主機名稱
pub struct DomainReader;

impl DomainReader {
    pub fn read(path: &Path) -> Result<Vec<WorkItem>> {
        let display = path.display().to_string();
        if !path.exists() {
            return Err(LookupError::input(display, "file not found"));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| LookupError::input(display.clone(), e.to_string()))?;
        let text = text.trim_start_matches('\u{feff}');

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let raw_items = match extension.as_deref() {
            Some("txt") => Self::parse_txt(text),
            Some("json") => {
                Self::parse_json(text).map_err(|message| LookupError::input(display, message))?
            }
            _ => {
                return Err(LookupError::input(
                    display,
                    "only .txt and .json files are supported",
                ))
            }
        };

        let items = raw_items
            .iter()
            .filter_map(|raw| {
                let item = WorkItem::new(extract_domain(raw));
                if item.is_none() {
                    tracing::warn!("Skipping entry without a host: {:?}", raw);
                }
                item
            })
            .collect();

        Ok(items)
    }

    fn parse_txt(text: &str) -> Vec<String> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// 接受陣列，或只含一個陣列值的物件
    fn parse_json(text: &str) -> std::result::Result<Vec<String>, String> {
        let data: Value =
            serde_json::from_str(text).map_err(|e| format!("invalid JSON: {}", e))?;

        let list = match data {
            Value::Array(list) => list,
            Value::Object(map) => {
                let mut lists: Vec<(String, Vec<Value>)> = map
                    .into_iter()
                    .filter_map(|(key, value)| match value {
                        Value::Array(list) => Some((key, list)),
                        _ => None,
                    })
                    .collect();

                match lists.len() {
                    0 => return Err("JSON object does not contain a list of domains".to_string()),
                    1 => lists.remove(0).1,
                    _ => {
                        let keys: Vec<String> = lists.into_iter().map(|(key, _)| key).collect();
                        return Err(format!(
                            "JSON object contains several lists ({}), cannot tell which holds the domains",
                            keys.join(", ")
                        ));
                    }
                }
            }
            _ => return Err("JSON must be a list or an object holding a list".to_string()),
        };

        Ok(list
            .into_iter()
            .map(|value| match value {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect())
    }
}

/// URL、host:port 或 host/path 皆取出主機部分
pub fn extract_domain(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains("://") {
        if let Some(host) = Url::parse(raw)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
        {
            return host.trim_start_matches('[').trim_end_matches(']').to_string();
        }
    }

    let without_scheme = raw.split("://").last().unwrap_or(raw);
    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    authority.split(':').next().unwrap_or_default().to_string()
}
