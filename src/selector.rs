//! Response selection.
//!
//! Chooses which declared response of an operation to return, either the one a
//! client asked for explicitly or the declared response with the lowest status
//! code.

use crate::error::SelectionError;
use crate::openapi::{MethodResponseTable, ResponseKey, ResponseSpec};

/// The response chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection<'a> {
    pub status: u16,
    pub response: &'a ResponseSpec,
}

/// Select a response from `table`.
///
/// `requested` is the raw key a client asked for. It must match a declared
/// key exactly, and that key must be a status code: an explicit request for
/// `default` fails with [`SelectionError::InvalidStatusKey`]. Without a
/// request the lowest declared status code wins; `default` is never picked.
pub fn select<'a>(
    table: &'a MethodResponseTable,
    requested: Option<&str>,
) -> Result<Selection<'a>, SelectionError> {
    match requested {
        Some(raw) => {
            let (key, response) = table
                .iter()
                .find(|(key, _)| key.to_string() == raw)
                .ok_or_else(|| SelectionError::NoSuchResponse(raw.to_string()))?;
            let status = key
                .status()
                .ok_or_else(|| SelectionError::InvalidStatusKey(raw.to_string()))?;
            Ok(Selection { status, response })
        }
        None => table
            .iter()
            .filter_map(|(key, response)| key.status().map(|status| (status, response)))
            .min_by_key(|(status, _)| *status)
            .map(|(status, response)| Selection { status, response })
            .ok_or(SelectionError::NoResponsesDeclared),
    }
}

/// Keys a client may request explicitly, for error messages and logs.
pub fn selectable_keys(table: &MethodResponseTable) -> Vec<String> {
    table
        .keys()
        .filter(|key| !matches!(key, ResponseKey::Default))
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(description: &str) -> ResponseSpec {
        ResponseSpec {
            description: description.to_string(),
            ..Default::default()
        }
    }

    fn table(keys: &[ResponseKey]) -> MethodResponseTable {
        keys.iter()
            .map(|key| (*key, response(&format!("response {key}"))))
            .collect()
    }

    #[test]
    fn test_default_selects_lowest_status() {
        let table = table(&[
            ResponseKey::Status(404),
            ResponseKey::Status(201),
            ResponseKey::Status(200),
            ResponseKey::Status(500),
        ]);

        let selection = select(&table, None).unwrap();
        assert_eq!(selection.status, 200);
        assert_eq!(selection.response.description, "response 200");
    }

    #[test]
    fn test_default_key_never_auto_selected() {
        let table = table(&[ResponseKey::Default, ResponseKey::Status(503)]);
        assert_eq!(select(&table, None).unwrap().status, 503);
    }

    #[test]
    fn test_empty_table() {
        let empty = MethodResponseTable::new();
        assert_eq!(
            select(&empty, None).unwrap_err(),
            SelectionError::NoResponsesDeclared
        );

        let only_default = table(&[ResponseKey::Default]);
        assert_eq!(
            select(&only_default, None).unwrap_err(),
            SelectionError::NoResponsesDeclared
        );
    }

    #[test]
    fn test_requested_key_wins() {
        let table = table(&[
            ResponseKey::Status(200),
            ResponseKey::Status(404),
            ResponseKey::Status(500),
        ]);

        for (raw, status) in [("200", 200), ("404", 404), ("500", 500)] {
            let selection = select(&table, Some(raw)).unwrap();
            assert_eq!(selection.status, status);
            assert_eq!(selection.response.description, format!("response {status}"));
        }
    }

    #[test]
    fn test_requested_key_not_declared() {
        let table = table(&[ResponseKey::Status(200)]);

        for raw in ["999", "404", "abc", "0200", " 200"] {
            assert_eq!(
                select(&table, Some(raw)).unwrap_err(),
                SelectionError::NoSuchResponse(raw.to_string())
            );
        }
    }

    #[test]
    fn test_requested_default_is_rejected() {
        let declared = table(&[ResponseKey::Status(200), ResponseKey::Default]);
        assert_eq!(
            select(&declared, Some("default")).unwrap_err(),
            SelectionError::InvalidStatusKey("default".to_string())
        );

        // Without a declared default the key simply does not exist.
        let undeclared = table(&[ResponseKey::Status(200)]);
        assert_eq!(
            select(&undeclared, Some("default")).unwrap_err(),
            SelectionError::NoSuchResponse("default".to_string())
        );
    }

    #[test]
    fn test_selectable_keys() {
        let table = table(&[
            ResponseKey::Default,
            ResponseKey::Status(404),
            ResponseKey::Status(200),
        ]);
        assert_eq!(selectable_keys(&table), vec!["200", "404"]);
    }
}
