/// Replace `${ENV_VAR}` placeholders in raw config text.
///
/// Only upper-case names (`[A-Z_][A-Z0-9_]*`) are substituted. `$${NAME}`
/// escapes to the literal text `${NAME}`. Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

fn is_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_uppercase() || c == '_')
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Implementation behind [`substitute_env`] with an injectable lookup, so it
/// is testable without mutating the process environment.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(escaped) = tail.strip_prefix("$${") {
            result.push_str("${");
            rest = escaped;
            continue;
        }

        let Some(after_brace) = tail.strip_prefix("${") else {
            result.push('$');
            rest = &tail[1..];
            continue;
        };

        match after_brace.find('}') {
            Some(end) if is_env_name(&after_brace[..end]) => {
                let name = &after_brace[..end];
                match lookup(name) {
                    Some(val) => result.push_str(&val),
                    None => result.push_str(&tail[..end + 3]),
                }
                rest = &after_brace[end + 1..];
            },
            _ => {
                result.push_str("${");
                rest = after_brace;
            },
        }
    }

    result.push_str(rest);
    result
}
