// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

#[test]
fn ids_look_up_by_str() {
    let mut map = HashMap::new();
    map.insert(JobId::new("job-1"), 42);
    assert_eq!(map.get("job-1"), Some(&42));
}

#[test]
fn ids_serialize_as_plain_strings() {
    let id = ResourceId::new("117");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"117\"");
    let back: ResourceId = serde_json::from_str("\"117\"").unwrap();
    assert_eq!(back, "117");
}

#[test]
fn empty_id_reports_empty() {
    assert!(JobId::new("").is_empty());
    assert!(!JobId::new("j").is_empty());
}
