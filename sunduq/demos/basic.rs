//! Basic example of the Sunduq IoC container.
//!
//! Run with `cargo run -p sunduq --example basic`.

use std::sync::Arc;

use sunduq::prelude::*;

// === Define your traits and types ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger {
    prefix: String,
}

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[{}] {msg}", self.prefix);
    }
}

struct DatabaseConfig;

struct Database {
    url: String,
}

struct UserRepository {
    db: Arc<Database>,
    logger: Slot<Arc<dyn Logger>>,
}

impl UserRepository {
    fn find_user(&self, id: u64) -> String {
        if let Some(logger) = self.logger.get() {
            logger.log(&format!("SELECT * FROM users WHERE id = {id}"));
        }
        format!("User {id} from {}", self.db.url)
    }
}

struct App;

// === Describe them ===

fn catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with(
            TypeDescriptor::new::<App>("demo.App")
                .component_scan(["demo"])
                .import(["demo.ConsoleLogger", "demo.DatabaseConfig", "demo.UserRepository"]),
        )
        .with(
            TypeDescriptor::new::<ConsoleLogger>("demo.ConsoleLogger")
                .component()
                .named("logger")
                .implements::<ConsoleLogger, dyn Logger>(|l| l)
                .constructor(ConstructorDescriptor::new::<ConsoleLogger>(
                    vec![InjectionPoint::value::<String>("prefix", "${log.prefix:LOG}")],
                    |args| Ok(ConsoleLogger { prefix: args.take(0)? }),
                )),
        )
        // Configuration types produce further beans from factory members.
        .with(
            TypeDescriptor::new::<DatabaseConfig>("demo.DatabaseConfig")
                .configuration()
                .constructor(ConstructorDescriptor::new::<DatabaseConfig>(vec![], |_| Ok(DatabaseConfig)))
                .factory(FactoryMember::new::<DatabaseConfig, Database>(
                    "database",
                    vec![InjectionPoint::value::<String>("url", "${db.url:postgres://localhost/app}")],
                    |_, args| Ok(Database { url: args.take(0)? }),
                )),
        )
        .with(
            TypeDescriptor::new::<UserRepository>("demo.UserRepository")
                .component()
                .constructor(ConstructorDescriptor::new::<UserRepository>(
                    vec![InjectionPoint::autowire::<Database>("db")],
                    |args| {
                        Ok(UserRepository {
                            db: args.take(0)?,
                            logger: Slot::default(),
                        })
                    },
                ))
                .member(MemberDescriptor::setter(
                    InjectionPoint::autowire_named::<dyn Logger>("logger", "logger"),
                    |repo: &UserRepository, logger: Arc<dyn Logger>| {
                        repo.logger.set(logger);
                        Ok(())
                    },
                )),
        )
}

fn main() -> Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt().with_env_filter("sunduq_container=debug").init();

    let properties = PropertyStore::builder()
        .with_environment()
        .with_toml("demo.toml", "[log]\nprefix = \"demo\"\n")?
        .build();

    let context = ApplicationContext::builder()
        .catalog(catalog())
        .properties(properties)
        .root("demo.App")
        .build()?;

    let repo: Arc<UserRepository> = context.get_bean_by_type()?;
    println!("{}", repo.find_user(42));
    println!("Beans: {:?}", context.bean_names());

    context.close()
}
