use lodestone_lib::utils::hash::sha512_bytes;
use lodestone_lib::{
    ArchiveState, JarManifestReader, LocalIndex, ModrinthClient, RetryPolicy, SyncConfig,
    SyncOrchestrator,
};
use serde_json::json;
use std::io::{Cursor, Write};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fabric_jar(id: &str, name: &str, build: &str) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    use zip::write::FileOptions;
    zip.start_file::<&str, ()>("fabric.mod.json", FileOptions::default())
        .unwrap();
    zip.write_all(format!(r#"{{"schemaVersion": 1, "id": "{}", "name": "{}"}}"#, id, name).as_bytes())
        .unwrap();
    zip.start_file::<&str, ()>("build.txt", FileOptions::default())
        .unwrap();
    zip.write_all(build.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

fn version_json(
    server: &MockServer,
    project: &str,
    id: &str,
    published: &str,
    filename: &str,
    sha512: &str,
    requires: &[&str],
) -> serde_json::Value {
    let dependencies: Vec<_> = requires
        .iter()
        .map(|p| json!({ "project_id": p, "version_id": null, "dependency_type": "required" }))
        .collect();
    json!({
        "id": id,
        "project_id": project,
        "version_number": id,
        "game_versions": ["1.21.8"],
        "loaders": ["fabric"],
        "version_type": "release",
        "date_published": published,
        "files": [{
            "url": format!("{}/cdn/{}", server.uri(), filename),
            "filename": filename,
            "hashes": { "sha512": sha512 },
            "primary": true
        }],
        "dependencies": dependencies
    })
}

fn orchestrator(server: &MockServer, mods_dir: &std::path::Path) -> SyncOrchestrator {
    let config = SyncConfig {
        mods_dir: mods_dir.to_path_buf(),
        api_base_url: server.uri(),
        ..SyncConfig::default()
    };
    let client = ModrinthClient::from_config(&config)
        .unwrap()
        .with_retry_policy(RetryPolicy::immediate());
    SyncOrchestrator::new(config, Arc::new(client), Arc::new(JarManifestReader))
}

#[tokio::test]
async fn first_run_updates_and_second_run_is_idempotent() {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();
    let mods = tmp.path().join("mods");
    std::fs::create_dir_all(&mods).unwrap();

    let old = fabric_jar("examplemod", "Example Mod", "1.0");
    let new = fabric_jar("examplemod", "Example Mod", "2.0");
    let api = fabric_jar("fabric-api", "Fabric API", "0.130");
    std::fs::write(mods.join("examplemod-1.0.jar"), &old).unwrap();

    Mock::given(method("GET"))
        .and(path("/project/examplemod/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            version_json(&server, "examplemod", "v2", "2025-03-01T00:00:00Z",
                "examplemod-2.0.jar", &sha512_bytes(&new), &["fabric-api"]),
            version_json(&server, "examplemod", "v1", "2025-01-01T00:00:00Z",
                "examplemod-1.0.jar", &sha512_bytes(&old), &[]),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/project/fabric-api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            version_json(&server, "fabric-api", "fa1", "2025-02-01T00:00:00Z",
                "fabric-api-0.130.jar", &sha512_bytes(&api), &[]),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cdn/examplemod-2.0.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(new.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cdn/fabric-api-0.130.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(api.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hits": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let first = orchestrator(&server, &mods).run().await.unwrap();
    assert_eq!(first.total(), 2);
    assert_eq!(first.succeeded(), 2);
    assert_eq!(first.dependencies().count(), 1);
    assert!(mods.join("examplemod-2.0.jar").exists());
    assert!(mods.join("fabric-api-0.130.jar").exists());
    assert!(!mods.join("examplemod-1.0.jar").exists());

    let index = LocalIndex::load(mods.join(".modIndex.json")).await.unwrap();
    assert_eq!(index.len(), 2);
    assert!(index.find_by_hash(&sha512_bytes(&old)).is_none());
    assert_eq!(
        index.find_by_hash(&sha512_bytes(&api)).unwrap().project_id,
        "fabric-api"
    );
    let index_after_first = std::fs::read_to_string(mods.join(".modIndex.json")).unwrap();

    let second = orchestrator(&server, &mods).run().await.unwrap();
    assert_eq!(second.total(), 2);
    assert!(second
        .archives
        .iter()
        .all(|a| a.state == ArchiveState::UpToDate));
    assert_eq!(second.downloaded().count(), 0);
    assert_eq!(
        std::fs::read_to_string(mods.join(".modIndex.json")).unwrap(),
        index_after_first
    );
}

#[tokio::test]
async fn unreachable_catalog_fails_files_not_the_batch() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("examplemod.jar"),
        fabric_jar("examplemod", "Example Mod", "1.0"),
    )
    .unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let report = orchestrator(&server, tmp.path()).run().await.unwrap();
    assert_eq!(report.total(), 1);
    assert_eq!(report.archives[0].state, ArchiveState::Failed);
    assert_eq!(report.summary(), "0/1 archives synchronized");
    assert!(tmp.path().join("examplemod.jar").exists());
}
