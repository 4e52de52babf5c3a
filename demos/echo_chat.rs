use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};

use sharework_sdk::urls::Endpoints;
use sharework_sdk::ws::echo::EchoClient;

fn main() -> Result<(), Box<dyn Error>> {
    let host = "REPLACE_WITH_HOST:PORT".to_string();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let client = EchoClient::new(Endpoints::new(host));
        let mut session = client.session();

        let counter = AtomicUsize::new(0);
        session.connect(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Some(format!("hello #{n}"))
        })?;

        let mut received = 0;
        while let Some(reply) = session.recv().await {
            println!("echo reply: {reply}");
            received += 1;
            if received == 5 {
                break;
            }
        }

        session.disconnect();
        Ok(())
    })
}
