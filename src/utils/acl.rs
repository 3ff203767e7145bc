//! Dot-separated access rules as carried by session tokens.
//!
//! `*` matches exactly one segment, `#` matches every remaining segment
//! (including none) and `me` matches the subject of the token.

pub fn acl_grants(granted: &str, required: &str, subject: &str) -> bool {
    let granted: Vec<&str> = granted.split('.').collect();
    let required: Vec<&str> = required.split('.').collect();
    matches_segments(&granted, &required, subject)
}

pub fn any_acl_grants<'a, I>(granted: I, required: &str, subject: &str) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    granted
        .into_iter()
        .any(|rule| acl_grants(rule, required, subject))
}

fn matches_segments(granted: &[&str], required: &[&str], subject: &str) -> bool {
    match (granted.split_first(), required.split_first()) {
        (None, None) => true,
        (Some((&"#", _)), _) => true,
        (Some((rule, rest_rule)), Some((segment, rest_required))) => {
            let segment_ok = match *rule {
                "*" => true,
                "me" => *segment == "me" || *segment == subject,
                other => other == *segment,
            };
            segment_ok && matches_segments(rest_rule, rest_required, subject)
        }
        _ => false,
    }
}
