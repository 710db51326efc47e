#[cfg(test)]
mod tests {
    use crate::field::Field;
    use crate::field_path::FieldPath;
    use crate::field_tree_printer::FieldTreePrinter;
    use crate::value::Value;
    use proptest::prelude::*;

    /// Wire-ordered paths: a depth-first walk of a random tree.
    fn arb_paths() -> impl Strategy<Value = Vec<FieldPath>> {
        proptest::collection::vec((0usize..4, 0usize..3), 1..40).prop_map(|steps| {
            let mut paths = Vec::new();
            let mut current = vec!["Response".to_string()];
            let mut counter = 0;
            for (depth, width) in steps {
                current.truncate(depth.min(current.len()).max(1));
                for _ in 0..width {
                    counter += 1;
                    current.push(format!("Node{counter}"));
                }
                counter += 1;
                paths.push(FieldPath::new(current.clone()).child(format!("Leaf{counter}")));
            }
            paths
        })
    }

    proptest! {
        #[test]
        fn test_indent_tracks_depth(paths in arb_paths()) {
            let fields: Vec<Field> = paths
                .iter()
                .map(|path| Field {
                    path: path.clone(),
                    value: Value::Int8(0),
                    start_offset: 0,
                    end_offset: 0,
                })
                .collect();
            let lines = FieldTreePrinter::new(&fields).lines();

            // Every leaf sits at two spaces per ancestor, so siblings always line up.
            let leaves: Vec<&String> = lines.iter().filter(|l| l.contains("- Leaf")).collect();
            assert_eq!(leaves.len(), paths.len());
            for (line, path) in leaves.iter().zip(&paths) {
                let indent = line.len() - line.trim_start().len();
                assert_eq!(indent, (path.depth() - 1) * 2);
            }
            assert!(lines[0].starts_with("- Response"));
        }
    }
}
