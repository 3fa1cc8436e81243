//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation on a char boundary.
/// Keeps model replies and user prompts out of the logs beyond a short preview.
pub fn trunc_for_log(s: &str, max_chars: usize) -> String {
  let total = s.chars().count();
  if total <= max_chars {
    s.to_string()
  } else {
    let head: String = s.chars().take(max_chars).collect();
    format!("{}… ({} chars total)", head, total)
  }
}

/// If `s` is exactly one fenced block (```json ... ``` or ``` ... ```), return its body.
pub fn strip_code_fence(s: &str) -> &str {
  let t = s.trim();
  let Some(rest) = t.strip_prefix("```") else { return t };
  let Some(body) = rest.strip_suffix("```") else { return t };
  let body = body.strip_prefix("json").unwrap_or(body);
  body.trim()
}

/// Plain syntactic check, the identity provider has the final word.
pub fn looks_like_email(s: &str) -> bool {
  let s = s.trim();
  match s.split_once('@') {
    Some((user, domain)) => {
      !user.is_empty() && !domain.starts_with('.') && domain.contains('.') && !domain.ends_with('.') && !s.contains(char::is_whitespace)
    }
    None => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_fills_known_keys_only() {
    let out = fill_template("{a} and {b} but {c}", &[("a", "1"), ("b", "2")]);
    assert_eq!(out, "1 and 2 but {c}");
  }

  #[test]
  fn code_fence_is_stripped() {
    assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("```\nplain\n```"), "plain");
    assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    assert_eq!(strip_code_fence("```unterminated"), "```unterminated");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    assert_eq!(trunc_for_log("héllo", 10), "héllo");
    assert_eq!(trunc_for_log("héllo", 2), "hé… (5 chars total)");
  }

  #[test]
  fn email_shape() {
    assert!(looks_like_email("a@b.co"));
    assert!(!looks_like_email("a@b"));
    assert!(!looks_like_email("@b.co"));
    assert!(!looks_like_email("a b@c.co"));
  }
}
