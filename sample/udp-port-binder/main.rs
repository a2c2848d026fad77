use std::env::args;
use std::net::UdpSocket;

fn main() {
    let port = args().nth(1).unwrap_or_else(|| "0".to_string());
    let listener = UdpSocket::bind(format!("127.0.0.1:{}", port)).unwrap();
    let mut buf = [0; 10];
    listener.recv(&mut buf).unwrap();
    println!("Done receiving on UDP socket");
}
