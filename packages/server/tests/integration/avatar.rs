use image::{GenericImageView, ImageFormat};

use crate::common::{TestApp, image_bytes, routes};

fn decode(bytes: &[u8]) -> image::DynamicImage {
    image::load_from_memory(bytes).expect("response should be a decodable image")
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn png_upload_stores_original_and_preview() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Alice", 20).await;
        let png = image_bytes(200, 100, ImageFormat::Png);

        let res = app
            .upload_avatar(student_id, "me.png", "image/png", png.clone())
            .await;

        assert_eq!(res.status, 200, "upload failed: {:?}", res.body);
        assert_eq!(res.body["student_id"].as_i64().unwrap(), student_id as i64);
        assert_eq!(res.body["file_size"].as_i64().unwrap(), png.len() as i64);
        assert_eq!(res.body["media_type"].as_str().unwrap(), "image/png");
        assert!(res.body["preview_size"].as_u64().unwrap() > 0);
        assert_eq!(app.stored_files(), vec![format!("{student_id}.png")]);

        let stored = std::fs::read(app.avatar_dir.join(format!("{student_id}.png"))).unwrap();
        assert_eq!(stored, png);
    }

    #[tokio::test]
    async fn file_field_name_is_accepted() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Bob", 21).await;

        let part = reqwest::multipart::Part::bytes(image_bytes(40, 40, ImageFormat::Png))
            .file_name("bob.png")
            .mime_str("image/png")
            .unwrap();
        let form = reqwest::multipart::Form::new().part("file", part);
        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::upload(student_id)))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn reupload_keeps_id_and_replaces_preview() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Carol", 22).await;

        let first = app
            .upload_avatar(
                student_id,
                "a.png",
                "image/png",
                image_bytes(200, 100, ImageFormat::Png),
            )
            .await;
        assert_eq!(first.status, 200);

        let square = image_bytes(50, 50, ImageFormat::Png);
        let second = app
            .upload_avatar(student_id, "b.png", "image/png", square.clone())
            .await;
        assert_eq!(second.status, 200);
        assert_eq!(second.id(), first.id());
        assert_eq!(second.body["file_size"].as_i64().unwrap(), square.len() as i64);

        let preview = app.get(&routes::preview(student_id)).await;
        assert_eq!(decode(&preview.bytes).dimensions(), (100, 100));
        assert_eq!(app.stored_files(), vec![format!("{student_id}.png")]);
    }

    #[tokio::test]
    async fn reupload_with_other_extension_leaves_single_file() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Dan", 23).await;

        app.upload_avatar(
            student_id,
            "a.png",
            "image/png",
            image_bytes(30, 30, ImageFormat::Png),
        )
        .await;
        let res = app
            .upload_avatar(
                student_id,
                "a.JPG",
                "image/jpeg",
                image_bytes(30, 30, ImageFormat::Jpeg),
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(app.stored_files(), vec![format!("{student_id}.jpg")]);
    }

    #[tokio::test]
    async fn unknown_student_returns_404_without_writing() {
        let app = TestApp::spawn().await;

        let res = app
            .upload_avatar(
                424242,
                "ghost.png",
                "image/png",
                image_bytes(20, 20, ImageFormat::Png),
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
        assert!(app.stored_files().is_empty());
    }

    #[tokio::test]
    async fn non_image_type_is_rejected() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Eve", 24).await;

        let res = app
            .upload_avatar(student_id, "notes.txt", "text/plain", b"hello".to_vec())
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(res.body["message"], "File must be an image");
        assert!(app.stored_files().is_empty());
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Finn", 25).await;

        let res = app
            .upload_avatar(student_id, "empty.png", "image/png", Vec::new())
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "File is empty");
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Gina", 26).await;

        let res = app
            .upload_avatar(student_id, "big.png", "image/png", vec![7u8; 301 * 1024])
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "File is too large (max 300 KB)");
        assert!(app.stored_files().is_empty());
    }

    #[tokio::test]
    async fn missing_avatar_field_is_rejected() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Hank", 27).await;

        let form = reqwest::multipart::Form::new().text("note", "no file here");
        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::upload(student_id)))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn filename_without_extension_is_rejected() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Ivy", 28).await;

        let res = app
            .upload_avatar(
                student_id,
                "avatar",
                "image/png",
                image_bytes(20, 20, ImageFormat::Png),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn corrupt_image_fails_and_leaves_no_file() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Jack", 29).await;

        let res = app
            .upload_avatar(student_id, "broken.png", "image/png", b"not a png".to_vec())
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(res.body["code"], "UPLOAD_FAILED");
        assert!(app.stored_files().is_empty());

        let lookup = app.get(&routes::preview(student_id)).await;
        assert_eq!(lookup.status, 404);
    }

    #[tokio::test]
    async fn corrupt_reupload_keeps_previous_cover() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Jill", 29).await;
        let png = image_bytes(40, 20, ImageFormat::Png);
        app.upload_avatar(student_id, "a.png", "image/png", png.clone())
            .await;

        let res = app
            .upload_avatar(student_id, "b.png", "image/png", b"not a png".to_vec())
            .await;
        assert_eq!(res.status, 500);

        let cover = app.get(&routes::cover(student_id)).await;
        assert_eq!(cover.status, 200);
        assert_eq!(cover.bytes, png);
    }

    #[tokio::test]
    async fn very_tall_image_is_rejected() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Kurt", 30).await;

        let res = app
            .upload_avatar(
                student_id,
                "strip.png",
                "image/png",
                image_bytes(1, 16000, ImageFormat::Png),
            )
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(res.body["code"], "UPLOAD_FAILED");
        assert!(app.stored_files().is_empty());
    }
}

mod preview {
    use super::*;

    #[tokio::test]
    async fn preview_is_100px_wide_jpeg() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Kim", 30).await;
        app.upload_avatar(
            student_id,
            "wide.png",
            "image/png",
            image_bytes(200, 100, ImageFormat::Png),
        )
        .await;

        let res = app.get(&routes::preview(student_id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.content_type.as_deref(), Some("image/png"));
        assert_eq!(res.content_length, Some(res.bytes.len() as u64));
        assert_eq!(image::guess_format(&res.bytes).unwrap(), ImageFormat::Jpeg);
        assert_eq!(decode(&res.bytes).dimensions(), (100, 50));
    }

    #[tokio::test]
    async fn preview_height_is_rounded() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Lee", 31).await;
        app.upload_avatar(
            student_id,
            "tall.gif",
            "image/gif",
            image_bytes(30, 20, ImageFormat::Gif),
        )
        .await;

        let res = app.get(&routes::preview(student_id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(decode(&res.bytes).dimensions(), (100, 67));
    }

    #[tokio::test]
    async fn missing_avatar_returns_404() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Mia", 32).await;

        let res = app.get(&routes::preview(student_id)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod cover {
    use super::*;

    #[tokio::test]
    async fn streams_original_bytes() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Ned", 33).await;
        let png = image_bytes(64, 32, ImageFormat::Png);
        app.upload_avatar(student_id, "orig.png", "image/png", png.clone())
            .await;

        let res = app.get(&routes::cover(student_id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.content_type.as_deref(), Some("image/png"));
        assert_eq!(res.content_length, Some(png.len() as u64));
        assert_eq!(res.bytes, png);
    }

    #[tokio::test]
    async fn file_deleted_out_of_band_returns_404() {
        let app = TestApp::spawn().await;
        let student_id = app.create_student("Olga", 34).await;
        app.upload_avatar(
            student_id,
            "gone.png",
            "image/png",
            image_bytes(10, 10, ImageFormat::Png),
        )
        .await;

        std::fs::remove_file(app.avatar_dir.join(format!("{student_id}.png"))).unwrap();

        let res = app.get(&routes::cover(student_id)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");

        // The preview lives in the database and is unaffected.
        let preview = app.get(&routes::preview(student_id)).await;
        assert_eq!(preview.status, 200);
    }

    #[tokio::test]
    async fn missing_avatar_returns_404() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::cover(777)).await;

        assert_eq!(res.status, 404);
    }
}

mod list {
    use super::*;

    #[tokio::test]
    async fn lists_avatars_with_pagination() {
        let app = TestApp::spawn().await;
        for name in ["Pat", "Quinn", "Ray"] {
            let student_id = app.create_student(name, 18).await;
            let res = app
                .upload_avatar(
                    student_id,
                    "face.png",
                    "image/png",
                    image_bytes(12, 12, ImageFormat::Png),
                )
                .await;
            assert_eq!(res.status, 200);
        }

        let res = app
            .get(&format!("{}?page=2&per_page=2", routes::AVATARS))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["pagination"]["page"], 2);
        assert_eq!(res.body["pagination"]["per_page"], 2);
        assert_eq!(res.body["pagination"]["total"], 3);
        assert_eq!(res.body["pagination"]["total_pages"], 2);
    }

    #[tokio::test]
    async fn empty_list() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::AVATARS).await;

        assert_eq!(res.status, 200);
        assert!(res.body["data"].as_array().unwrap().is_empty());
        assert_eq!(res.body["pagination"]["total"], 0);
    }
}
