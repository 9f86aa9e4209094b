//! Basic example of the Wirebox container.

use std::sync::Arc;

use parking_lot::Mutex;
use wirebox::prelude::*;

// === Define your types ===

#[derive(Default)]
struct ConsoleLogger;

impl ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[LOG] {msg}");
    }
}

struct Config {
    smtp_host: String,
}

struct Mailer {
    logger: Arc<ConsoleLogger>,
    retries: u32,
    signature: Mutex<Option<String>>,
    queue: Mutex<Option<String>>,
}

impl Mailer {
    fn send(&self, to: &str) {
        let signature = self.signature.lock().clone().unwrap_or_default();
        self.logger
            .log(&format!("Mail to {to} ({} retries) {signature}", self.retries));
    }
}

// === Describe them to the container ===

fn types() -> TypeTable {
    TypeTable::new()
        .with(ClassDescriptor::interface("ILogger"))
        .with(ClassDescriptor::of::<ConsoleLogger>("ConsoleLogger"))
        .with(
            ClassDescriptor::with_constructor::<Mailer, _>(
                "Mailer",
                vec![
                    ParameterDescriptor::class("logger", "ILogger"),
                    ParameterDescriptor::scalar("retries").with_default(3u32),
                ],
                |args| {
                    Ok(Mailer {
                        logger: args.get(0)?,
                        retries: args.value(1)?,
                        signature: Mutex::new(None),
                        queue: Mutex::new(None),
                    })
                },
            )
            .method::<Mailer, _>(
                "set_signature",
                vec![ParameterDescriptor::scalar("signature").with_default(String::from("-- sent by wirebox"))],
                |mailer, args| {
                    *mailer.signature.lock() = Some(args.value(0)?);
                    Ok(())
                },
            )
            .method::<Mailer, _>(
                "set_queue",
                vec![ParameterDescriptor::scalar("queue").with_default(String::from("default"))],
                |mailer, args| {
                    *mailer.queue.lock() = Some(args.value(0)?);
                    Ok(())
                },
            ),
        )
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter("wirebox_container=debug")
        .init();

    // Build the container
    let mut container = Container::builder().introspector(types()).build()?;

    // Logger — interface bound to a concrete class, shared
    container.singleton("ILogger", "ConsoleLogger");
    // Config — a plain factory
    container.singleton(
        "config",
        Concrete::value(|_, _| {
            Ok(Config {
                smtp_host: "smtp.example.com".to_string(),
            })
        }),
    );
    // Setter injection, except for set_queue on Mailer
    container.enable_injector_detection(Blacklist::new().for_class("Mailer", "set_queue"))?;
    container.on_resolving(|_, instance| {
        println!("🔔 resolved a value");
        Ok(instance)
    });

    println!("✅ Container built successfully!");
    println!("{container:?}");

    let config = container.resolve_as::<Config>("config")?;
    println!("📋 Config: smtp_host={}", config.smtp_host);

    let mailer = container.resolve_as::<Mailer>("Mailer")?;
    mailer.send("ada@example.com");
    println!("📬 queue injected: {}", mailer.queue.lock().is_some());

    // Transient: a new Mailer, the same logger
    let other = container.resolve_as::<Mailer>("Mailer")?;
    println!("🔁 same mailer: {}", Arc::ptr_eq(&mailer, &other));
    println!("🔁 same logger: {}", Arc::ptr_eq(&mailer.logger, &other.logger));

    // Unknown names come with suggestions
    if let Err(err) = container.resolve("Mailr") {
        println!("❌ {err}");
    }

    println!("\n🎉 Everything works!");
    Ok(())
}
