use std::error::Error;

use sharework_sdk::urls::Endpoints;
use sharework_sdk::ws::files::FilesClient;

fn main() -> Result<(), Box<dyn Error>> {
    let host = "REPLACE_WITH_HOST:PORT".to_string();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let client = FilesClient::new(Endpoints::new(host));
        let mut session = client.session();
        session.connect()?;

        let listing = session.path_each().await?;
        for (index, name) in &listing {
            println!("{index}: {name}");
        }
        session.path_end().await?;

        session.disconnect();
        Ok(())
    })
}
