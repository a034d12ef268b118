//! Integration tests driving [`DeviceClient`] against the emulator.

use std::net::SocketAddr;

use kshell_client::{ClientError, DeviceClient};
use kshell_device::{Device, DeviceHandle};
use kshell_emulator::{AdminCredentials, EmulatorServer};
use kshell_protocol::PortNumber;

async fn start_emulator() -> (SocketAddr, DeviceHandle) {
    let device = DeviceHandle::new(Device::default());
    let server = EmulatorServer::bind(
        "127.0.0.1:0".parse().unwrap(),
        device.clone(),
        AdminCredentials::default(),
    )
    .await
    .expect("bind emulator");
    let addr = server.local_addr();
    tokio::spawn(server.run());
    (addr, device)
}

async fn connect(addr: SocketAddr) -> DeviceClient {
    DeviceClient::connect(&addr.ip().to_string(), addr.port())
        .await
        .expect("connect")
}

#[tokio::test]
async fn challenge_login_and_outlet_control() {
    let (addr, device) = start_emulator().await;
    let mut client = connect(addr).await;
    client.clogin("admin", "admin").await.expect("clogin");

    assert_eq!(client.version().await.unwrap(), "2.33");
    assert_eq!(client.outlet_states().await.unwrap(), [false; 4]);

    let port = PortNumber::new(2).unwrap();
    client.set_outlet(port, true).await.unwrap();
    assert!(client.outlet_state(port).await.unwrap());
    assert_eq!(client.outlet_states().await.unwrap(), [false, true, false, false]);

    // The change is visible on the device itself.
    assert_eq!(device.outlet_states(), [false, true, false, false]);

    client.quit().await.expect("clean quit");
}

#[tokio::test]
async fn plain_login_and_settings() {
    let (addr, _device) = start_emulator().await;
    let mut client = connect(addr).await;
    client.login("admin", "admin").await.expect("login");

    assert_eq!(client.alias().await.unwrap(), "Zarathustra");
    client.set_alias("rack-7").await.unwrap();
    assert_eq!(client.alias().await.unwrap(), "rack-7");

    // The longest accepted alias round-trips verbatim.
    let longest = "a".repeat(18);
    client.set_alias(&longest).await.unwrap();
    assert_eq!(client.alias().await.unwrap(), longest);

    assert_eq!(client.swdelay().await.unwrap(), 15);
    client.set_swdelay(120).await.unwrap();
    assert_eq!(client.swdelay().await.unwrap(), 120);

    assert!(client.discover().await.unwrap());
    client.set_discover(false).await.unwrap();
    assert!(!client.discover().await.unwrap());

    let info = client.outlet_setup(PortNumber::new(1).unwrap()).await.unwrap();
    assert_eq!(info.name, "outlet x");
    assert!(!info.timer_mode);
    assert_eq!(info.interrupt_delay, 5);
    assert!(!info.power_on_state);
}

#[tokio::test]
async fn rejected_login_is_surfaced_and_retryable() {
    let (addr, _device) = start_emulator().await;
    let mut client = connect(addr).await;

    let error = client.clogin("admin", "wrong").await.unwrap_err();
    assert!(matches!(error, ClientError::AuthenticationFailed), "{error}");

    // The session survives a failed attempt.
    client.clogin("admin", "admin").await.expect("retry");
    assert_eq!(client.version().await.unwrap(), "2.33");
}

#[tokio::test]
async fn commands_before_login_fail() {
    let (addr, _device) = start_emulator().await;
    let mut client = connect(addr).await;

    let error = client.version().await.unwrap_err();
    assert!(matches!(error, ClientError::NotAuthenticated), "{error}");
}

#[tokio::test]
async fn device_side_validation_maps_to_errors() {
    let (addr, _device) = start_emulator().await;
    let mut client = connect(addr).await;
    client.login("admin", "admin").await.expect("login");

    let error = client.set_alias(&"x".repeat(19)).await.unwrap_err();
    assert!(matches!(error, ClientError::InvalidParameter), "{error}");

    let error = client.set_swdelay(5000).await.unwrap_err();
    assert!(matches!(error, ClientError::InvalidValue), "{error}");

    let error = client.login("admin", "admin").await.unwrap_err();
    assert!(matches!(error, ClientError::AlreadyAuthenticated), "{error}");
}

#[tokio::test]
async fn two_clients_see_the_same_device() {
    let (addr, _device) = start_emulator().await;
    let mut first = connect(addr).await;
    let mut second = connect(addr).await;
    first.login("admin", "admin").await.expect("first login");
    second.login("admin", "admin").await.expect("second login");

    let outlet = PortNumber::new(4).unwrap();
    first.set_outlet(outlet, true).await.unwrap();
    assert!(second.outlet_state(outlet).await.unwrap());

    first.quit().await.unwrap();
    // The other session keeps working after the first one ends.
    assert!(second.outlet_state(outlet).await.unwrap());
}
