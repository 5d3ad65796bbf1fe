use super::*;

#[test]
fn token_follows_node_phase() {
    let node = Node::new();
    let token = node.liveness();
    assert!(!token.is_live());
    assert!(!node.is_attached());

    node.attach();
    assert!(token.is_live());
    assert!(node.is_attached());

    node.detach();
    assert!(!token.is_live());
    assert!(!node.is_attached());
}

#[test]
fn drop_detaches() {
    let node = Node::new();
    let token = node.liveness();
    node.attach();
    drop(node);
    assert!(!token.is_live());
}

#[test]
fn drop_unattached() {
    let node = Node::new();
    let token = node.liveness();
    drop(node);
    assert!(!token.is_live());
}

#[test]
#[should_panic(expected = "`Node` cannot be attached twice.")]
fn attach_twice_panic() {
    let node = Node::new();
    node.attach();
    node.attach();
}

#[test]
#[should_panic(expected = "`Node` cannot be attached twice.")]
fn attach_after_detach_panic() {
    let node = Node::new();
    node.attach();
    node.detach();
    node.attach();
}

#[test]
#[should_panic(expected = "`Node` is not attached yet.")]
fn detach_before_attach_panic() {
    let node = Node::new();
    node.detach();
}

#[test]
#[should_panic(expected = "`Node` is already detached.")]
fn detach_twice_panic() {
    let node = Node::new();
    node.attach();
    node.detach();
    node.detach();
}
