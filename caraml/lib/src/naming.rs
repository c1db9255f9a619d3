//! Identifier derivation for resources and types.
//!
//! Resource names are lower camel case (`/test-it` becomes `testIt`), type
//! names upper camel case (`url` becomes `Url`).

/// Splits an arbitrary string into words.
///
/// Words break on any non-alphanumeric character, on a lowercase letter
/// followed by an uppercase one, before the last capital of an acronym
/// (`HTTPClient` splits as `HTTP`, `Client`), and between letters and
/// digits.
pub fn split_words(s: &str) -> Vec<String> {
    let mut words = Vec::new();

    for chunk in s.split(|c: char| !c.is_alphanumeric()) {
        let chars: Vec<char> = chunk.chars().collect();
        let mut current = String::new();

        for (i, &c) in chars.iter().enumerate() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                let is_boundary = (c.is_uppercase() && prev.is_lowercase())
                    || (c.is_uppercase() && prev.is_uppercase() && next_is_lower)
                    || (c.is_ascii_digit() != prev.is_ascii_digit());
                if is_boundary && !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            current.push(c);
        }

        if !current.is_empty() {
            words.push(current);
        }
    }

    words
}

/// Converts a string to `lowerCamelCase`.
///
/// ## Examples
///
/// ```
/// use caraml_lib::naming::lower_camel_case;
///
/// assert_eq!(lower_camel_case("test-it"), "testIt");
/// assert_eq!(lower_camel_case("{username}"), "username");
/// assert_eq!(lower_camel_case("user_messages"), "userMessages");
/// ```
pub fn lower_camel_case(s: &str) -> String {
    let mut out = String::new();
    for (i, word) in split_words(s).iter().enumerate() {
        let lower = word.to_lowercase();
        if i == 0 {
            out.push_str(&lower);
        } else {
            out.push_str(&capitalize(&lower));
        }
    }
    out
}

/// Converts a string to `UpperCamelCase`.
///
/// ## Examples
///
/// ```
/// use caraml_lib::naming::upper_camel_case;
///
/// assert_eq!(upper_camel_case("url"), "Url");
/// assert_eq!(upper_camel_case("message-attachment"), "MessageAttachment");
/// ```
pub fn upper_camel_case(s: &str) -> String {
    capitalize(&lower_camel_case(s))
}

/// Derives a resource's property name from its relative URI.
///
/// Takes the last path segment, drops the separator, and converts the rest
/// to lower camel case.
///
/// ## Examples
///
/// ```
/// use caraml_lib::naming::resource_name;
///
/// assert_eq!(resource_name("/users"), "users");
/// assert_eq!(resource_name("/test-it"), "testIt");
/// assert_eq!(resource_name("/users/me"), "me");
/// assert_eq!(resource_name("/{id}"), "id");
/// ```
pub fn resource_name(relative_uri: &str) -> String {
    let trimmed = relative_uri.trim_end_matches('/');
    let segment = trimmed.rsplit('/').next().unwrap_or(trimmed);
    lower_camel_case(segment)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_on_separators() {
        assert_eq!(split_words("test-it"), vec!["test", "it"]);
        assert_eq!(split_words("a_b c"), vec!["a", "b", "c"]);
        assert_eq!(split_words("--x--"), vec!["x"]);
    }

    #[test]
    fn split_camel_case_boundaries() {
        assert_eq!(split_words("userMessages"), vec!["user", "Messages"]);
        assert_eq!(split_words("HTTPClient"), vec!["HTTP", "Client"]);
        assert_eq!(split_words("OpenAI"), vec!["Open", "AI"]);
    }

    #[test]
    fn split_digits() {
        assert_eq!(split_words("v2api"), vec!["v", "2", "api"]);
    }

    #[test]
    fn split_empty() {
        assert!(split_words("").is_empty());
        assert!(split_words("{}").is_empty());
    }

    #[test]
    fn lower_camel() {
        assert_eq!(lower_camel_case("users"), "users");
        assert_eq!(lower_camel_case("Test It"), "testIt");
        assert_eq!(lower_camel_case("XMLHttpRequest"), "xmlHttpRequest");
        assert_eq!(lower_camel_case("get"), "get");
    }

    #[test]
    fn upper_camel() {
        assert_eq!(upper_camel_case("User"), "User");
        assert_eq!(upper_camel_case("poke"), "Poke");
        assert_eq!(upper_camel_case("lib.Thing"), "LibThing");
    }

    #[test]
    fn resource_names() {
        assert_eq!(resource_name("/messages"), "messages");
        assert_eq!(resource_name("/get"), "get");
        assert_eq!(resource_name("/users/"), "users");
        assert_eq!(resource_name("/{userId}"), "userId");
    }
}
