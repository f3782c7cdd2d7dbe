//! Path resolution and name splitting.
//!
//! Grounded on the original source's `getDirByPath`/`getPathByLastSlash`
//! (`mfs.c`), recast from in-place `strtok`/`strrchr` mutation into
//! non-owning tokenization, following the teacher's own `Path::skipelem`
//! (`fs/path.rs`) — the one place the design notes call out by name as
//! a model to imitate ("immutable string views").

/// Splits `path` into its next leading component and the remainder.
///
/// Leading and repeated slashes are skipped. Returns `None` once no
/// component remains (an all-slash or empty remainder).
fn skip_elem(path: &str) -> Option<(&str, &str)> {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return None;
    }
    match path.find('/') {
        Some(idx) => Some((&path[..idx], &path[idx..])),
        None => Some((path, "")),
    }
}

/// An iterator over the non-empty components of a path string,
/// equivalent to repeatedly calling `skip_elem`.
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    let mut rest = path;
    std::iter::from_fn(move || {
        let (name, remainder) = skip_elem(rest)?;
        rest = remainder;
        Some(name)
    })
}

/// Splits `path` at the final `/` into `(parent_path, tail)`. If there
/// is no `/`, the parent path is `"."`. Used by mkdir/delete/open/isFile.
pub fn split_last_slash(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => {
            let parent = &path[..idx];
            let parent = if parent.is_empty() { "/" } else { parent };
            (parent, &path[idx + 1..])
        }
        None => (".", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_skips_empty_and_dot_like_c_strtok() {
        assert_eq!(components("a/bb/c").collect::<Vec<_>>(), vec!["a", "bb", "c"]);
        assert_eq!(components("///a//bb").collect::<Vec<_>>(), vec!["a", "bb"]);
        assert_eq!(components("a").collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(components("").collect::<Vec<_>>(), Vec::<&str>::new());
        assert_eq!(components("////").collect::<Vec<_>>(), Vec::<&str>::new());
    }

    #[test]
    fn split_last_slash_without_slash_uses_dot_as_parent() {
        assert_eq!(split_last_slash("foo"), (".", "foo"));
    }

    #[test]
    fn split_last_slash_with_slash() {
        assert_eq!(split_last_slash("a/b/c"), ("a/b", "c"));
        assert_eq!(split_last_slash("/foo"), ("/", "foo"));
    }
}
