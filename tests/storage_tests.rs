use actas_backend::storage::{LocalMediaStorage, MediaStorage, MockMediaStorage, StorageError};
use std::path::PathBuf;
use uuid::Uuid;

fn temp_root() -> PathBuf {
    std::env::temp_dir().join(format!("actas-media-{}", Uuid::new_v4()))
}

#[cfg(test)]
mod local_tests {
    use super::*;

    #[tokio::test]
    async fn test_save_then_read() {
        let root = temp_root();
        let storage = LocalMediaStorage::new(&root);
        storage.ensure_ready().await.unwrap();

        let path = storage
            .save("gestiones", "Acta de cierre.pdf", b"%PDF-1.7 contenido")
            .await
            .unwrap();

        assert!(path.starts_with("gestiones/"));
        assert!(path.ends_with("_Acta_de_cierre.pdf"));
        assert!(root.join(&path).is_file());

        let bytes = storage.read(&path).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.7 contenido");

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_same_name_never_collides() {
        let root = temp_root();
        let storage = LocalMediaStorage::new(&root);

        let first = storage.save("gestiones", "foto.jpg", b"uno").await.unwrap();
        let second = storage.save("gestiones", "foto.jpg", b"dos").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(storage.read(&first).await.unwrap(), b"uno");
        assert_eq!(storage.read(&second).await.unwrap(), b"dos");

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let storage = LocalMediaStorage::new(temp_root());
        let result = storage.read("actas/no-existe.pdf").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_traversal_is_rejected_before_touching_disk() {
        let root = temp_root();
        let storage = LocalMediaStorage::new(root.join("media"));
        storage.ensure_ready().await.unwrap();
        // A file right next to the media root must stay unreachable.
        tokio::fs::write(root.join("secret.txt"), b"top secret").await.unwrap();

        for path in ["../secret.txt", "actas/../../secret.txt", "/etc/passwd", ""] {
            let result = storage.read(path).await;
            assert!(matches!(result, Err(StorageError::InvalidPath(_))), "{path}");
        }

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_hostile_upload_name_stays_in_directory() {
        let root = temp_root();
        let storage = LocalMediaStorage::new(&root);

        let path = storage.save("gestiones", "../../evil.pdf", b"x").await.unwrap();
        assert!(path.starts_with("gestiones/"));
        assert!(!path.contains(".."));
        assert!(root.join(&path).is_file());

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_removes_only_the_named_file() {
        let root = temp_root();
        let storage = LocalMediaStorage::new(&root);

        let gone = storage.save("gestiones", "borrador.pdf", b"uno").await.unwrap();
        let kept = storage.save("gestiones", "final.pdf", b"dos").await.unwrap();

        storage.delete(&gone).await.unwrap();
        assert!(matches!(storage.read(&gone).await, Err(StorageError::NotFound(_))));
        assert!(matches!(storage.delete(&gone).await, Err(StorageError::NotFound(_))));
        assert_eq!(storage.read(&kept).await.unwrap(), b"dos");
        assert!(matches!(
            storage.delete("../final.pdf").await,
            Err(StorageError::InvalidPath(_))
        ));

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_round_trip() {
        let mock = MockMediaStorage::new();
        let path = mock.save("gestiones", "evidencia.jpeg", b"jpeg").await.unwrap();
        assert_eq!(mock.read(&path).await.unwrap(), b"jpeg");
        assert_eq!(mock.len().await, 1);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockMediaStorage::new_failing();
        assert!(matches!(
            mock.save("gestiones", "a.pdf", b"x").await,
            Err(StorageError::Simulated)
        ));
        assert!(matches!(mock.read("a.pdf").await, Err(StorageError::Simulated)));
    }

    #[tokio::test]
    async fn test_mock_rejects_traversal() {
        let mock = MockMediaStorage::new().with_file("actas/a.pdf", b"x".to_vec());
        assert!(matches!(
            mock.read("../actas/a.pdf").await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(mock.read("actas/a.pdf").await.is_ok());
    }
}
