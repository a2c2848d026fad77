use std::env::args;
use std::net::TcpListener;

fn main() {
    let port = args().nth(1).unwrap_or_else(|| "0".to_string());
    let listener = TcpListener::bind(format!("127.0.0.1:{}", port)).unwrap();
    println!("{}", listener.local_addr().unwrap().port());
    for stream in listener.incoming() {
        drop(stream);
    }
}
