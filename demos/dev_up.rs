extern crate env_logger;
extern crate picostack;

use picostack::core::netdev::spawn_rx;
use picostack::examples::env;

fn main() {
    env_logger::init();

    let env = env::default_env();
    let rx = spawn_rx(env.stack.clone(), env.dev.clone());

    println!("Answering ARP requests for {}.", env.netif.unicast());
    rx.join().unwrap();
}
