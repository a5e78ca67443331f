use crate::errors::FolioError;

/// Reject a move that would place `block_id` under itself or a descendant
///
/// Walks the ancestors of `new_parent_block_id` through `parent_of` until the
/// root. More than `max_steps` steps means the stored tree already contains a
/// cycle, which is reported as `Internal`.
///
/// # Errors
///
/// `CycleDetected` when `block_id` is found on the ancestor chain, `Internal`
/// when the walk does not terminate, or whatever `parent_of` returns.
pub fn ensure_no_cycle<F, E>(
    block_id: &str,
    new_parent_block_id: Option<&str>,
    max_steps: usize,
    mut parent_of: F,
) -> Result<(), E>
where
    F: FnMut(&str) -> Result<Option<String>, E>,
    E: From<FolioError>,
{
    let Some(new_parent) = new_parent_block_id else {
        return Ok(());
    };

    let mut current = Some(new_parent.to_string());
    let mut steps = 0;
    while let Some(id) = current {
        if id == block_id {
            return Err(FolioError::CycleDetected {
                block_id: block_id.to_string(),
                new_parent_block_id: new_parent.to_string(),
            }
            .into());
        }
        steps += 1;
        if steps > max_steps {
            return Err(FolioError::Internal {
                message: format!("ancestor walk from {} did not reach a root", new_parent),
            }
            .into());
        }
        current = parent_of(&id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn tree(edges: &[(&str, &str)]) -> HashMap<String, String> {
        edges
            .iter()
            .map(|(child, parent)| (child.to_string(), parent.to_string()))
            .collect()
    }

    fn walk(
        parents: &HashMap<String, String>,
        block_id: &str,
        new_parent: Option<&str>,
    ) -> Result<(), FolioError> {
        ensure_no_cycle(block_id, new_parent, parents.len() + 1, |id| {
            Ok::<_, FolioError>(parents.get(id).cloned())
        })
    }

    #[test]
    fn test_move_under_descendant_rejected() {
        // a -> b -> c
        let parents = tree(&[("b", "a"), ("c", "b")]);
        let err = walk(&parents, "a", Some("c")).unwrap_err();
        assert!(matches!(err, FolioError::CycleDetected { .. }));
    }

    #[test]
    fn test_move_under_self_rejected() {
        let parents = tree(&[]);
        assert!(matches!(
            walk(&parents, "a", Some("a")),
            Err(FolioError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_move_to_sibling_branch_allowed() {
        let parents = tree(&[("b", "a"), ("c", "a")]);
        assert!(walk(&parents, "b", Some("c")).is_ok());
        assert!(walk(&parents, "b", None).is_ok());
    }

    #[test]
    fn test_corrupt_chain_stops() {
        let parents = tree(&[("x", "y"), ("y", "x")]);
        assert!(matches!(
            walk(&parents, "a", Some("x")),
            Err(FolioError::Internal { .. })
        ));
    }
}
