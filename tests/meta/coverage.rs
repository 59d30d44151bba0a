//! Keeps `tests/unit` mirroring `src` file for file

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::fs;
    use std::io;
    use std::path::Path;

    const SOURCE_DIR: &str = "src";
    const UNIT_DIR: &str = "tests/unit";

    fn relative_paths(dir: &Path, base: &Path) -> io::Result<BTreeSet<String>> {
        let mut paths = BTreeSet::new();
        if !dir.is_dir() {
            return Ok(paths);
        }
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let relative = path
                .strip_prefix(base)
                .map_err(|_| io::Error::other("path outside base directory"))?
                .to_string_lossy()
                .to_string();
            if path.is_dir() {
                paths.extend(relative_paths(&path, base)?);
                paths.insert(relative);
            } else if path.extension().and_then(|ext| ext.to_str()) == Some("rs") {
                paths.insert(relative);
            }
        }
        Ok(paths)
    }

    // Entry points and module declarations need no counterpart
    fn needs_counterpart(relative: &str) -> bool {
        relative != "main.rs" && relative != "lib.rs" && !relative.ends_with("mod.rs")
    }

    // Tests every source module has a unit test file at the same relative path
    // Verified by deleting a unit test file
    #[test]
    fn test_all_src_files_have_unit_tests() -> io::Result<()> {
        let sources = relative_paths(Path::new(SOURCE_DIR), Path::new(SOURCE_DIR))?;
        let tests = relative_paths(Path::new(UNIT_DIR), Path::new(UNIT_DIR))?;
        let missing: Vec<String> = sources
            .iter()
            .filter(|path| needs_counterpart(path) && !tests.contains(*path))
            .map(|path| format!("  - src/{path} -> {UNIT_DIR}/{path}"))
            .collect();
        assert!(
            missing.is_empty(),
            "Source files without unit tests:\n{}",
            missing.join("\n")
        );
        Ok(())
    }

    // Tests no unit test file outlives the module it covers
    // Verified by adding a test file for a missing module
    #[test]
    fn test_all_unit_tests_have_src_counterparts() -> io::Result<()> {
        let sources = relative_paths(Path::new(SOURCE_DIR), Path::new(SOURCE_DIR))?;
        let tests = relative_paths(Path::new(UNIT_DIR), Path::new(UNIT_DIR))?;
        let orphaned: Vec<String> = tests
            .iter()
            .filter(|path| !path.ends_with("mod.rs") && !sources.contains(*path))
            .map(|path| format!("  - {UNIT_DIR}/{path}"))
            .collect();
        assert!(
            orphaned.is_empty(),
            "Unit test files without a source module:\n{}",
            orphaned.join("\n")
        );
        Ok(())
    }

    // Harness roots such as tests/unit.rs only declare the directory beside them
    fn is_harness_root(path: &Path, root: &Path) -> bool {
        path.parent() == Some(root) && path.with_extension("").is_dir()
    }

    fn files_without_tests(dir: &Path, root: &Path, found: &mut Vec<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                files_without_tests(&path, root, found)?;
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some("rs") {
                continue;
            }
            let is_module_file = path.file_name().is_some_and(|name| name == "mod.rs");
            if is_module_file || is_harness_root(&path, root) {
                continue;
            }
            if !fs::read_to_string(&path)?.contains("#[test]") {
                found.push(format!("  - {}", path.display()));
            }
        }
        Ok(())
    }

    // Tests every test file declares at least one test
    // Verified by emptying a test module
    #[test]
    fn test_all_test_files_contain_tests() -> io::Result<()> {
        let root = Path::new("tests");
        let mut found = Vec::new();
        files_without_tests(root, root, &mut found)?;
        assert!(
            found.is_empty(),
            "Test files without any #[test] function:\n{}",
            found.join("\n")
        );
        Ok(())
    }
}
