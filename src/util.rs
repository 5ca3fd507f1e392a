use std::{env::VarError, path::PathBuf};

use anyhow::{anyhow, bail, Result};
use kstring::KString;

/// Get an env var as a String; decoding failures are reported as
/// errors.
pub fn getenv(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(s) => Ok(Some(s)),
        Err(e) => match e {
            VarError::NotPresent => Ok(None),
            VarError::NotUnicode(_) => bail!("{name:?} env var is not unicode"),
        }
    }
}

pub fn getenv_or(name: &str, fallbackvalue: Option<&str>) -> Result<String> {
    match getenv(name)? {
        Some(s) => Ok(s),
        None => match fallbackvalue {
            Some(v) => Ok(v.to_string()),
            None => bail!("{name:?} env var is missing and \
                           no default provided"),
        }
    }
}

/// Interpret a flag value: `0`, `off`, `false`, `no` and the empty
/// string are false, anything else is true.
pub fn flag_value(s: &str) -> bool {
    !matches!(s.trim().to_lowercase().as_str(), "0" | "" | "off" | "false" | "no")
}

/// Get an env var as a flag, `default` if unset.
pub fn env_flag(name: &str, default: bool) -> Result<bool> {
    Ok(getenv(name)?.map(|s| flag_value(&s)).unwrap_or(default))
}

/// Parse an env var as a number, `default` if unset.
pub fn env_number(name: &str, default: u32) -> Result<u32> {
    match getenv(name)? {
        Some(s) => s.trim().parse().map_err(
            |e| anyhow!("{name:?} env var: invalid number {s:?}: {e}")),
        None => Ok(default)
    }
}

/// Parse a `NAME=PATH` custom component specification.
pub fn parse_component_spec(s: &str) -> Result<(KString, PathBuf)> {
    let (name, path) = s.split_once('=').ok_or_else(
        || anyhow!("component {s:?}: expecting NAME=PATH"))?;
    let name = name.trim();
    let path = path.trim();
    if name.is_empty() || path.is_empty() {
        bail!("component {s:?}: empty name or path")
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("component {s:?}: name must be a valid Lua identifier")
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        bail!("component {s:?}: name must not start with a digit")
    }
    Ok((KString::from_ref(name), PathBuf::from(path)))
}

/// Parse a comma separated list of `NAME=PATH` specifications.
pub fn parse_component_list(s: &str) -> Result<Vec<(KString, PathBuf)>> {
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(parse_component_spec)
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_flag_value() {
        for s in ["0", "", "off", "false", "no", "No", " OFF "] {
            assert!(!flag_value(s), "{s:?}");
        }
        for s in ["1", "on", "yes", "true", "whatever"] {
            assert!(flag_value(s), "{s:?}");
        }
    }

    #[test]
    fn t_parse_component_spec() {
        assert_eq!(parse_component_spec("Card=templates/components/card.lua").unwrap(),
                   (KString::from_ref("Card"),
                    PathBuf::from("templates/components/card.lua")));
        assert_eq!(parse_component_spec(" My_Box = box.lua ").unwrap().0.as_str(),
                   "My_Box");
        for bad in ["Card", "=x.lua", "Card=", "my-card=x.lua", "1Card=x.lua"] {
            assert!(parse_component_spec(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn t_parse_component_list() {
        let l = parse_component_list("A=a.lua, B=b.lua,").unwrap();
        assert_eq!(l.len(), 2);
        assert_eq!(l[1].1, PathBuf::from("b.lua"));
        assert!(parse_component_list("").unwrap().is_empty());
        assert!(parse_component_list("A=a.lua,B").is_err());
    }
}
