use std::path::PathBuf;

pub fn get_path(dir: &str, file: &str) -> PathBuf {
    let mut buf = PathBuf::new();

    for chunk in [dir, "migration", "postgresql", file] {
        buf.push(chunk);
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_path_layout() {
        let path = get_path("/srv/app", "asset_history.sql");
        assert_eq!(
            path,
            PathBuf::from("/srv/app/migration/postgresql/asset_history.sql")
        );
    }
}
