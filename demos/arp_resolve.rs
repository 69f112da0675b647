extern crate env_logger;
extern crate picostack;

use std::process;
use std::thread;
use std::time::Duration;

use picostack::core::netdev::spawn_rx;
use picostack::core::repr::Ipv4Address;
use picostack::core::service::Resolution;
use picostack::examples::env;

fn main() {
    env_logger::init();

    let addr = std::env::args()
        .nth(1)
        .expect("Usage: arp_resolve <ipv4-address>");
    let addr: Ipv4Address = addr.parse().expect("Expected an A.B.C.D style address.");

    let env = env::default_env();
    spawn_rx(env.stack.clone(), env.dev.clone());

    for _ in 0 .. 5 {
        match env.arp.resolve(&env.netif, addr, None) {
            Ok(Resolution::Found(hw_addr)) => {
                println!("{} is at {}", addr, hw_addr);
                return;
            }
            Ok(Resolution::Query) => {
                thread::sleep(Duration::from_millis(100));
            }
            Err(err) => {
                eprintln!("Resolving {} failed with {:?}.", addr, err);
            }
        }
    }

    process::exit(1);
}
