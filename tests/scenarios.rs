use asyncop::{Lifecycle, Node, Runtime, Seed, Status, Task};
use futures::channel::oneshot;
use rt_local::{runtime::core::test, spawn_local, wait_for_idle};

fn mock_api(response: &'static str) -> (Task<String, String>, rt_local::Task<()>) {
    let (sender, receiver) = oneshot::channel();
    let responder = spawn_local(async move {
        let _ = sender.send(if response == "fail" {
            Err("Failed response".to_string())
        } else {
            Ok("Success".to_string())
        });
    });
    let task = Task::new(async move { receiver.await.unwrap_or(Err("dropped".to_string())) });
    (task, responder)
}

#[test]
async fn successful_call() {
    let mut rt = Runtime::new();
    let node = Node::new();
    let op = node.use_async::<String, String>();
    node.attach();

    let (task, _responder) = mock_api("success");
    let handle = op.run(task).unwrap();
    assert!(op.is_loading());

    wait_for_idle().await;
    rt.update();
    assert!(op.is_success());
    assert_eq!(op.data().as_deref(), Some("Success"));
    assert_eq!(handle.await, Ok("Success".to_string()));
}

#[test]
async fn failed_call() {
    let mut rt = Runtime::new();
    let node = Node::new();
    let op = node.use_async::<String, String>();
    node.attach();

    let (task, _responder) = mock_api("fail");
    let handle = op.run(task).unwrap();
    while op.is_loading() {
        rt.wait_for_ready().await;
        rt.update();
    }
    assert!(op.is_error());
    assert_eq!(op.error().as_deref(), Some("Failed response"));
    assert_eq!(handle.await, Err("Failed response".to_string()));
}

#[test]
async fn unmount_during_call() {
    let mut rt = Runtime::new();
    let node = Node::new();
    let op = node.use_async::<String, String>();
    node.attach();

    let (task, _responder) = mock_api("success");
    let handle = op.run(task).unwrap();
    drop(node);

    wait_for_idle().await;
    rt.update();
    assert_eq!(op.status(), Status::Pending);
    assert_eq!(op.data(), None);
    assert_eq!(handle.await, Ok("Success".to_string()));
}

#[test]
fn set_data_and_reset() {
    let node = Node::new();
    let op = node
        .async_op::<String, String>()
        .seed(Seed::new().error("initial".to_string()))
        .build();
    node.attach();

    op.set_data("Data is set".to_string());
    assert_eq!(op.status().to_string(), "resolved");
    assert_eq!(op.data().as_deref(), Some("Data is set"));

    op.reset();
    assert_eq!(
        op.snapshot(),
        Lifecycle {
            status: Status::Idle,
            data: None,
            error: Some("initial".to_string())
        }
    );
}

#[test]
fn seed_from_config() {
    let seed: Seed<u32, String> =
        serde_json::from_str(r#"{ "status": "pending", "error": "stale" }"#).unwrap();
    let node = Node::new();
    let op = node.async_op::<u32, String>().seed(seed).build();
    assert!(op.is_loading());
    assert_eq!(op.error().as_deref(), Some("stale"));
    assert!(op.run(()).is_err());
}
