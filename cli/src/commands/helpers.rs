use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::process;

use kitchie_core::models::{DishImage, RecipeIngredient};
use kitchie_core::quantity::parse_quantity;

/// Parse a `name:quantity[:unit]` ingredient argument. The quantity may be
/// left out (`egg`), in which case the recipe needs 1.
pub(crate) fn parse_ingredient_arg(s: &str) -> Result<RecipeIngredient> {
    let mut parts = s.splitn(3, ':').map(str::trim);
    let name = parts.next().unwrap_or_default();
    if name.is_empty() {
        bail!("Invalid ingredient '{s}'. Use 'name:quantity[:unit]' (e.g. 'egg:2')");
    }

    let quantity = match parts.next() {
        None | Some("") => None,
        Some(q) => {
            let n = parse_quantity(q);
            if n <= 0.0 {
                bail!("Invalid quantity '{q}' for {name}. Enter a number greater than 0");
            }
            Some(n)
        }
    };
    let unit = parts.next().filter(|u| !u.is_empty()).map(String::from);

    Ok(RecipeIngredient {
        name: name.to_string(),
        quantity,
        unit,
    })
}

pub(crate) fn parse_dish_image(key: Option<&str>) -> Result<Option<DishImage>> {
    key.map(DishImage::parse).transpose()
}

/// Ask a yes/no question on stderr. `assume_yes` skips the prompt.
pub(crate) fn confirm(question: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    eprint!("{question} [y/N]: ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    Ok(is_yes(&line))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Report a missing record and exit with status 2.
pub(crate) fn not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

/// Display form of an ingredient name: "soy sauce" -> "Soy Sauce".
pub(crate) fn to_title(s: &str) -> String {
    s.trim()
        .split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// First 8 characters of a uuid, enough to tell records apart in a table.
pub(crate) fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(i, _)| &id[..i])
}

/// Resolve a full id from a unique prefix, as shown by [`short_id`].
pub(crate) fn match_id<'a, I>(ids: I, prefix: &str) -> Result<Option<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Ok(None);
    }
    let matches: Vec<&str> = ids.into_iter().filter(|id| id.starts_with(prefix)).collect();
    if let Some(exact) = matches.iter().find(|id| **id == prefix) {
        return Ok(Some((*exact).to_string()));
    }
    match matches.as_slice() {
        [] => Ok(None),
        [one] => Ok(Some((*one).to_string())),
        _ => bail!("Id prefix '{prefix}' is ambiguous ({} matches)", matches.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ingredient_arg() {
        let ing = parse_ingredient_arg("egg:2").unwrap();
        assert_eq!(ing.name, "egg");
        assert_eq!(ing.quantity, Some(2.0));
        assert!(ing.unit.is_none());

        let ing = parse_ingredient_arg(" milk : 1,5 : cup ").unwrap();
        assert_eq!(ing.name, "milk");
        assert_eq!(ing.quantity, Some(1.5));
        assert_eq!(ing.unit.as_deref(), Some("cup"));
    }

    #[test]
    fn test_parse_ingredient_arg_without_quantity() {
        let ing = parse_ingredient_arg("salt").unwrap();
        assert!(ing.quantity.is_none());
        assert_eq!(ing.need(), 1.0);
        let ing = parse_ingredient_arg("salt::pinch").unwrap();
        assert!(ing.quantity.is_none());
        assert_eq!(ing.unit.as_deref(), Some("pinch"));
    }

    #[test]
    fn test_parse_ingredient_arg_invalid() {
        assert!(parse_ingredient_arg("").is_err());
        assert!(parse_ingredient_arg(":2").is_err());
        assert!(parse_ingredient_arg("egg:0").is_err());
        assert!(parse_ingredient_arg("egg:lots").is_err());
    }

    #[test]
    fn test_parse_dish_image() {
        assert_eq!(parse_dish_image(Some("Cake")).unwrap(), Some(DishImage::Cake));
        assert_eq!(parse_dish_image(None).unwrap(), None);
        assert!(parse_dish_image(Some("sushi")).is_err());
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES \n"));
        assert!(!is_yes(""));
        assert!(!is_yes("nope"));
    }

    #[test]
    fn test_json_error_escapes() {
        assert_eq!(json_error("Recipe \"x\" not found"), r#"{"error":"Recipe \"x\" not found"}"#);
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("Crème brûlée tart", 10), "Crème b...");
    }

    #[test]
    fn test_match_id() {
        let ids = ["abc123", "abd456", "xyz"];
        assert_eq!(match_id(ids, "abc").unwrap().as_deref(), Some("abc123"));
        assert_eq!(match_id(ids, "xyz").unwrap().as_deref(), Some("xyz"));
        assert!(match_id(ids, "ab").is_err());
        assert!(match_id(ids, "q").unwrap().is_none());
        assert!(match_id(ids, " ").unwrap().is_none());
    }

    #[test]
    fn test_to_title() {
        assert_eq!(to_title("soy sauce"), "Soy Sauce");
        assert_eq!(to_title("  OLIVE oil "), "Olive Oil");
        assert_eq!(to_title("egg"), "Egg");
        assert_eq!(to_title(""), "");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0f8fad5b-d9cb-469f-a165-70867728950e"), "0f8fad5b");
        assert_eq!(short_id("abc"), "abc");
    }
}
