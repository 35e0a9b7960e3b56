//! Fetch a URL with retries and print the outcome.
//!
//! ```sh
//! cargo run --example fetch -- https://httpbin.org/get
//! ```

use std::time::Duration;

use convoy::RetryPolicy;

fn main() {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://httpbin.org/get".to_string());

    let handle = convoy::get(&url)
        .header("accept", "application/json")
        .timeout(Duration::from_secs(15))
        .retry(RetryPolicy::default().with_max_retries(2))
        .send()
        .expect("request could not be submitted");

    match handle.wait() {
        Ok(response) => {
            println!("status:   {}", response.status);
            println!("attempts: {}", handle.attempt_count());
            println!("total:    {:?}", response.info.total);
            if !response.error.is_empty() {
                println!("error:    {}", response.error);
            }
            println!("{}", response.body_text());
        }
        Err(e) => eprintln!("transfer failed: {e}"),
    }
}
