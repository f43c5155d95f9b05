//! Wildcard matching and last-match resolution.

use crate::node::PermissionNode;

/// Returns whether `permission` matches `pattern`.
///
/// `*` matches any run of characters, including an empty one; `?` matches
/// exactly one character. Every other character matches itself.
///
/// ```
/// use kissen_permission::matcher;
///
/// assert!(matcher("com.example.admin", "com.example.*"));
/// assert!(!matcher("a", "a?"));
/// ```
pub fn matcher(permission: &str, pattern: &str) -> bool {
    let given: Vec<char> = permission.chars().collect();
    let tested: Vec<char> = pattern.chars().collect();

    let (mut g, mut t) = (0, 0);
    // Position of the last `*` in the pattern and the input position it
    // currently absorbs up to.
    let mut star: Option<(usize, usize)> = None;

    while g < given.len() {
        match tested.get(t) {
            Some('*') => {
                star = Some((t, g));
                t += 1;
            }
            Some(&c) if c == '?' || c == given[g] => {
                t += 1;
                g += 1;
            }
            _ => match star {
                Some((star_t, star_g)) => {
                    t = star_t + 1;
                    g = star_g + 1;
                    star = Some((star_t, star_g + 1));
                }
                None => return false,
            },
        }
    }

    while tested.get(t) == Some(&'*') {
        t += 1;
    }
    t == tested.len()
}

/// Resolves `permission` against `candidates`.
///
/// All candidates whose name matches are ordered by name and the last one
/// decides. Since wildcard prefixes sort before longer names in common
/// naming schemes, this tends to pick the most specific node. Returns
/// `None` when nothing matches.
pub fn resolve_node<'a>(
    permission: &str,
    candidates: impl IntoIterator<Item = &'a PermissionNode>,
) -> Option<&'a PermissionNode> {
    candidates
        .into_iter()
        .filter(|node| matcher(permission, &node.name))
        .max_by(|a, b| a.name.cmp(&b.name))
}

/// Like [`resolve_node`], yielding the verdict.
pub fn resolve<'a>(
    permission: &str,
    candidates: impl IntoIterator<Item = &'a PermissionNode>,
) -> Option<bool> {
    resolve_node(permission, candidates).map(|node| node.value)
}
