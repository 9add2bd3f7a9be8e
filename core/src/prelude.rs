/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the tmpljs template compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 *
 * 1. OPEN SOURCE: You may use this file under the terms of the GNU Affero
 * General Public License v3.0. If you link to this code, your ENTIRE
 * application must be open-sourced under AGPLv3.
 *
 * 2. COMMERCIAL: For proprietary use, you must obtain a Commercial License
 * from Sovereign Systems.
 *
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 * NO IMPLIED LICENSE to rights of Mohamad Al-Zawahreh or Sovereign Systems.
 */

//! The JavaScript runtime every compiled bundle relies on.
//!
//! `runtime.js` is a single expression evaluating to
//! `{version, truth, str, include, globals, builtins}`. Generated code only
//! reaches it through the `__rt` binding, so a page that loads the prelude
//! once can link several bundles against it (`PreludeMode::Linked`).

/// Bumped whenever the runtime's observable behavior changes.
pub const PRELUDE_VERSION: &str = "1.0.0";

const SOURCE: &str = include_str!("prelude/runtime.js");

/// The prelude expression, ready to be assigned to `__rt`.
pub fn source() -> &'static str {
    SOURCE.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::builtin_names;

    #[test]
    fn test_header_matches_version() {
        let first = source().lines().next().unwrap();
        assert_eq!(
            first,
            format!("/* tmpljs runtime prelude, version {} */", PRELUDE_VERSION)
        );
        assert!(source().contains(&format!("var VERSION = \"{}\";", PRELUDE_VERSION)));
    }

    #[test]
    fn test_every_builtin_is_defined() {
        for name in builtin_names() {
            let key = format!("\n    {}: ", name);
            assert!(source().contains(&key), "prelude does not define {}", name);
        }
    }

    #[test]
    fn test_is_one_expression() {
        let src = source();
        assert!(src.ends_with("})()"));
        // Block comments only.
        for line in src.lines() {
            assert!(!line.trim_start().starts_with("//"), "line comment: {}", line);
        }
        assert!(src.is_ascii());
    }
}
