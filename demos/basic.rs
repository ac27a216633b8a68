use std::time::Duration;

use fluent_rest::{ClientOptions, RestClient};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct User {
    id: u64,
    name: String,
}

#[derive(Serialize)]
struct NewUser<'a> {
    name: &'a str,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let api = RestClient::from_env().map_err(anyhow::Error::msg)?.with_options(ClientOptions {
        timeout_ms: 5_000,
        max_retries: 2,
        retry_interval_ms: 50,
    });

    let created: User = api
        .post()
        .sub_resource("users")
        .body(Some(&NewUser { name: "Kit" }))
        .execute()
        .await
        .decode()?;
    println!("created {created:?}");

    let user: User = api
        .get()
        .sub_resourcef("/users/%d", &[&created.id])
        .with_timeout(Duration::from_secs(2))
        .execute()
        .await
        .decode()?;
    println!("fetched {} ({})", user.name, user.id);

    let page: Vec<User> = api
        .get()
        .sub_resource("users")
        .with_param("limit", "10")
        .with_param("sort", "name")
        .execute()
        .await
        .decode()?;
    for user in page {
        println!("{user:?}");
    }

    Ok(())
}
