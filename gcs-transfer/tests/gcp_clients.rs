mod common;

use std::time::Duration;

use gcs_transfer::auth::AccessToken;
use gcs_transfer::gcp::{GcsClient, StorageTransferClient};
use gcs_transfer_core::access::destination_bucket;
use gcs_transfer_core::config::AwsCredentials;
use gcs_transfer_core::contract::{
    AccessControl, AccessRole, ApiError, ObjectStorage, TransferScheduler, PATCH_FIELD_MASK,
};
use gcs_transfer_core::job::build_transfer_job;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn token() -> AccessToken {
    AccessToken::new("test-token")
}

#[tokio::test]
async fn missing_bucket_is_none_and_requests_are_authorised() {
    let server = common::start(|_| {
        (
            404,
            r#"{"error":{"code":404,"message":"The specified bucket does not exist."}}"#.into(),
        )
    })
    .await;
    let client =
        GcsClient::with_base_url(token(), &format!("{}/storage/v1", server.base_url)).unwrap();

    let bucket = client.get_bucket("alpha").await.unwrap();
    assert!(bucket.is_none());

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path(), "/storage/v1/b/alpha");
    assert_eq!(
        requests[0].authorization.as_deref(),
        Some("Bearer test-token")
    );
}

#[tokio::test]
async fn create_bucket_sends_fixed_policy() {
    let server = common::start(|_| {
        (
            200,
            r#"{"kind":"storage#bucket","name":"alpha","location":"US","storageClass":"NEARLINE"}"#
                .into(),
        )
    })
    .await;
    let client =
        GcsClient::with_base_url(token(), &format!("{}/storage/v1", server.base_url)).unwrap();

    let bucket = client
        .create_bucket("proj", &destination_bucket("alpha"))
        .await
        .unwrap();
    assert_eq!(bucket.name, "alpha");
    assert_eq!(bucket.storage_class.as_deref(), Some("NEARLINE"));

    let request = &server.requests()[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path(), "/storage/v1/b");
    assert!(request.target.contains("project=proj"));
    assert!(request.target.contains("predefinedAcl=projectPrivate"));
    assert!(request.target.contains("predefinedDefaultObjectAcl=projectPrivate"));
    let body = request.json();
    assert_eq!(body["name"], "alpha");
    assert_eq!(body["location"], "US");
    assert_eq!(body["storageClass"], "NEARLINE");
}

#[tokio::test]
async fn conflict_maps_to_conflict_error() {
    let server = common::start(|_| {
        (
            409,
            r#"{"error":{"code":409,"message":"You already own this bucket."}}"#.into(),
        )
    })
    .await;
    let client = GcsClient::with_base_url(token(), &server.base_url).unwrap();

    let err = client
        .create_bucket("proj", &destination_bucket("alpha"))
        .await
        .unwrap_err();
    match err {
        ApiError::Conflict(message) => assert_eq!(message, "You already own this bucket."),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn acl_entry_round_trip() {
    let server = common::start(|request| match request.method.as_str() {
        "GET" => (404, "{}".into()),
        _ => (200, request.body.clone()),
    })
    .await;
    let client = GcsClient::with_base_url(token(), &server.base_url).unwrap();

    let entity = AccessControl::user_entity("sa@example.com");
    assert!(client
        .get_access_control("alpha", &entity)
        .await
        .unwrap()
        .is_none());

    let entry = AccessControl {
        entity: entity.clone(),
        role: AccessRole::Writer,
    };
    let inserted = client.insert_access_control("alpha", &entry).await.unwrap();
    assert_eq!(inserted, entry);

    let requests = server.requests();
    assert_eq!(requests[0].path(), "/b/alpha/acl/user-sa@example.com");
    assert_eq!(requests[1].path(), "/b/alpha/acl");
    assert_eq!(requests[1].json()["role"], "WRITER");
}

#[tokio::test]
async fn list_jobs_follows_page_tokens() {
    let server = common::start(|request| {
        if request.target.contains("pageToken=next") {
            (
                200,
                r#"{"transferJobs":[{"name":"transferJobs/2","description":"b","status":"DISABLED"}]}"#
                    .into(),
            )
        } else {
            (
                200,
                r#"{"transferJobs":[{"name":"transferJobs/1","description":"a","status":"ENABLED","projectId":"proj"}],"nextPageToken":"next"}"#
                    .into(),
            )
        }
    })
    .await;
    let client = StorageTransferClient::with_base_url(token(), &server.base_url).unwrap();

    let jobs = client.list_jobs("proj").await.unwrap();
    let names: Vec<_> = jobs.iter().map(|j| j.name.as_str()).collect();
    assert_eq!(names, vec!["transferJobs/1", "transferJobs/2"]);

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].target.contains("filter="));
    assert!(requests[0].target.contains("projectId"));
}

#[tokio::test]
async fn empty_listing_has_no_jobs() {
    let server = common::start(|_| (200, "{}".into())).await;
    let client = StorageTransferClient::with_base_url(token(), &server.base_url).unwrap();
    assert!(client.list_jobs("proj").await.unwrap().is_empty());
}

#[tokio::test]
async fn service_account_and_job_mutations() {
    let server = common::start(|request| match (request.method.as_str(), request.path()) {
        ("GET", "/googleServiceAccounts/proj") => (
            200,
            r#"{"accountEmail":"project-1@storage-transfer-service.iam.gserviceaccount.com"}"#
                .into(),
        ),
        ("POST", "/transferJobs") => {
            let mut job = request.json();
            job["name"] = "transferJobs/55".into();
            (200, job.to_string())
        }
        ("PATCH", "/transferJobs/55") => (200, request.body.clone()),
        _ => (500, r#"{"error":{"message":"unexpected"}}"#.into()),
    })
    .await;
    let client = StorageTransferClient::with_base_url(token(), &server.base_url).unwrap();

    let account = client.get_service_account("proj").await.unwrap();
    assert!(account.account_email.starts_with("project-1@"));

    let creds = AwsCredentials {
        access_key_id: "AKIA".into(),
        secret_access_key: "secret".into(),
    };
    let today = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let job = build_transfer_job("proj", "alpha", &creds, today);
    let created = client.create_job(&job).await.unwrap();
    assert_eq!(created.name, "transferJobs/55");
    assert_eq!(created.description, "AWS S3: alpha to GCS Daily Transfer");

    client
        .patch_job("transferJobs/55", "proj", &job.to_patch(), PATCH_FIELD_MASK)
        .await
        .unwrap();

    let requests = server.requests();
    let patch = requests[2].json();
    assert_eq!(patch["projectId"], "proj");
    assert_eq!(patch["updateTransferJobFieldMask"], "transferSpec,status");
    assert!(patch["transferJob"].get("schedule").is_none());
    assert_eq!(patch["transferJob"]["status"], "ENABLED");
}

#[tokio::test]
async fn server_error_keeps_status_and_message() {
    let server = common::start(|_| {
        (
            403,
            r#"{"error":{"code":403,"message":"Permission denied"}}"#.into(),
        )
    })
    .await;
    let client = StorageTransferClient::with_base_url(token(), &server.base_url).unwrap();

    let err = client.get_service_account("proj").await.unwrap_err();
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "Permission denied");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn repeated_page_token_ends_listing() {
    let server = common::start(|_| {
        (
            200,
            r#"{"transferJobs":[{"name":"transferJobs/1","description":"a"}],"nextPageToken":"same"}"#
                .into(),
        )
    })
    .await;
    let client = StorageTransferClient::with_base_url(token(), &server.base_url).unwrap();

    let jobs = tokio::time::timeout(Duration::from_secs(5), client.list_jobs("proj"))
        .await
        .expect("listing should stop on a repeated page token")
        .unwrap();
    assert_eq!(jobs.len(), 2);

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].target.contains("pageToken="));
    assert!(requests[1].target.contains("pageToken=same"));
}

#[tokio::test]
async fn create_response_without_description_still_decodes() {
    let server = common::start(|_| (200, r#"{"name":"transferJobs/9"}"#.into())).await;
    let client = StorageTransferClient::with_base_url(token(), &server.base_url).unwrap();

    let creds = AwsCredentials {
        access_key_id: "AKIA".into(),
        secret_access_key: "secret".into(),
    };
    let today = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let job = build_transfer_job("proj", "alpha", &creds, today);
    let created = client.create_job(&job).await.unwrap();
    assert_eq!(created.name, "transferJobs/9");
    assert!(created.description.is_empty());
}

#[tokio::test]
async fn chunked_request_body_is_recorded() {
    let server = common::start(|request| (200, request.body.clone())).await;
    let addr = server.base_url.trim_start_matches("http://");

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(
            b"POST /v1/transferJobs HTTP/1.1\r\n\
              host: localhost\r\n\
              content-type: application/json\r\n\
              transfer-encoding: chunked\r\n\
              connection: close\r\n\
              \r\n\
              7\r\n{\"a\":1}\r\n0\r\n\r\n",
        )
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path(), "/v1/transferJobs");
    assert_eq!(requests[0].json()["a"], 1);
}
