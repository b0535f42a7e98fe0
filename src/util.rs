use std::borrow::Cow;

/// Converts a `snake_case` member name into a `camelCase` field name.
pub fn to_camel_case(s: &'_ str) -> Cow<'_, str> {
    let mut dest = Cow::Borrowed(s);

    // handle '_' to be more friendly with the
    // _var convention for unused variables
    let s_iter = if let Some(stripped) = s.strip_prefix('_') {
        stripped
    } else {
        s
    }
    .split('_')
    .enumerate();

    for (i, part) in s_iter {
        if i > 0 && part.len() == 1 {
            dest += Cow::Owned(part.to_uppercase());
        } else if i > 0 && part.len() > 1 {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                dest += Cow::Owned(first.to_uppercase().collect::<String>());
                dest += chars.as_str();
            }
        } else if i == 0 {
            dest = Cow::Borrowed(part);
        }
    }

    dest
}

/// Checks whether `input` matches `/^[_a-zA-Z][_a-zA-Z0-9]*$/`.
pub fn is_valid_name(input: &str) -> bool {
    let mut chars = input.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[test]
fn test_to_camel_case() {
    assert_eq!(&to_camel_case("test")[..], "test");
    assert_eq!(&to_camel_case("_test")[..], "test");
    assert_eq!(&to_camel_case("first_second")[..], "firstSecond");
    assert_eq!(&to_camel_case("first_")[..], "first");
    assert_eq!(&to_camel_case("a_b_c")[..], "aBC");
    assert_eq!(&to_camel_case("a_bc")[..], "aBc");
    assert_eq!(&to_camel_case("a_b")[..], "aB");
    assert_eq!(&to_camel_case("a")[..], "a");
    assert_eq!(&to_camel_case("")[..], "");
}

#[test]
fn test_name_is_valid() {
    assert!(is_valid_name("Foo"));
    assert!(is_valid_name("foo42"));
    assert!(is_valid_name("_Foo"));
    assert!(is_valid_name("_Foo42"));
    assert!(is_valid_name("_foo42"));
    assert!(is_valid_name("_0"));

    assert!(!is_valid_name("42_Foo"));
    assert!(!is_valid_name("Foo-42"));
    assert!(!is_valid_name("Foo???"));
    assert!(!is_valid_name(""));
}
