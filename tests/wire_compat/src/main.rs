fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use parcel_protocol::messages::*;
    use parcel_protocol::{Command, UploadDetails, UploadStatus};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  server: {fixture}\n  Rust:   {reserialized}"
        );
        parsed
    }

    #[test]
    fn fixture_initiate() {
        let req: InitiateRequest = roundtrip_test("initiate_request.json");
        assert_eq!(req.content_type, "video/mp4");
        let resp: InitiateResponse = roundtrip_test("initiate_response.json");
        assert!(resp.key.starts_with("video-uploads/"));
    }

    #[test]
    fn fixture_signed_url() {
        let req: SignedUrlRequest = roundtrip_test("signed_url_request.json");
        assert_eq!(req.part_number, 3);
        let resp: SignedUrlResponse = roundtrip_test("signed_url_response.json");
        assert!(resp.signed_url.contains("partNumber=3"));
    }

    #[test]
    fn fixture_complete() {
        let req: CompleteRequest = roundtrip_test("complete_request.json");
        let numbers: Vec<u32> = req.parts.iter().map(|p| p.part_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(req.parts.iter().all(|p| !p.etag.contains('"')));

        let resp: CompleteResponse = roundtrip_test("complete_response.json");
        assert_eq!(resp.bucket, "uploads");
        // The multipart ETag stays quoted as the store returns it.
        assert!(resp.etag.starts_with('"'));
    }

    #[test]
    fn fixture_abort() {
        let req: AbortRequest = roundtrip_test("abort_request.json");
        assert_eq!(req.upload_id, "2~abortme");
        let resp: AbortResponse = roundtrip_test("abort_response.json");
        assert!(resp.ok);
    }

    #[test]
    fn fixture_upload_details() {
        let details: UploadDetails = roundtrip_test("upload_details.json");
        assert_eq!((details.parts_uploaded, details.total_parts), (2, 3));
    }

    #[test]
    fn status_strings() {
        for (status, text) in [
            (UploadStatus::Idle, "idle"),
            (UploadStatus::Ready, "ready"),
            (UploadStatus::Uploading, "uploading"),
            (UploadStatus::Complete, "complete"),
            (UploadStatus::Error, "error"),
        ] {
            assert_eq!(serde_json::to_value(status).unwrap(), serde_json::json!(text));
        }
    }

    #[test]
    fn command_patterns() {
        let patterns: Vec<serde_json::Value> = [
            Command::Initiate,
            Command::SignUrl,
            Command::Complete,
            Command::Abort,
        ]
        .into_iter()
        .map(Command::pattern)
        .collect();
        assert_eq!(
            patterns,
            vec![
                serde_json::json!({"cmd": "initiate_upload"}),
                serde_json::json!({"cmd": "get_signed_url"}),
                serde_json::json!({"cmd": "complete_upload"}),
                serde_json::json!({"cmd": "abort_upload"}),
            ]
        );
    }

    #[test]
    fn minimal_complete_response() {
        let resp: CompleteResponse =
            serde_json::from_value(serde_json::json!({"location": "http://x/b/k"})).unwrap();
        assert_eq!(resp.location, "http://x/b/k");
        assert!(resp.key.is_empty());
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            serde_json::json!({"location": "http://x/b/k"})
        );
    }
}
