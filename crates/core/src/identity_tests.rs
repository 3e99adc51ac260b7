// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn random_suffix_uses_lowercase_alphanumerics() {
    for _ in 0..50 {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()), "{suffix}");
    }
}

#[yare::parameterized(
    with_alias = { "seoul", "ab12", "seoul_ab12" },
    trimmed    = { "  seoul ", "ab12", "seoul_ab12" },
    bare       = { "", "ab12", "ab12" },
)]
fn compose_identity(alias: &str, suffix: &str, expected: &str) {
    assert_eq!(compose(alias, suffix), expected);
}

#[yare::parameterized(
    alias_and_suffix = { "alias_xy12", "alias" },
    bare_suffix      = { "abc1", "" },
    long_suffix      = { "alias_xy123", "" },
    three_parts      = { "a_b_cd12", "" },
    legacy_format    = { "agent_1700000000000_k2j3h4g5", "" },
)]
fn extract_alias_from_id(id: &str, expected: &str) {
    assert_eq!(extract_alias(&AgentId::new(id)), expected);
}

#[test]
fn generate_prefixes_alias() {
    let identity = Identity::generate("busan");
    assert!(identity.id.starts_with("busan_"));
    assert_eq!(identity.alias, "busan");
    assert_eq!(Identity::adopt(identity.id.clone()).alias, "busan");
}
