use crate::{InitArgs, config::Config};

const STARTER_TEMPLATE: &str = "<!doctype html>\n<html>\n<head>\n    <meta charset=\"utf-8\">\n    <title>{{ site.name }}</title>\n    <link rel=\"stylesheet\" href=\"/styles/main.css\">\n</head>\n<body>\n    <h1>{{ site.name }}</h1>\n</body>\n</html>\n";

const STARTER_STYLE: &str = "body {\n    font-family: system-ui, sans-serif;\n    margin: 0 auto;\n    max-width: 40rem;\n}\n";

const STARTER_DATA: &str = "{\n    \"site\": {\n        \"name\": \"My Weft Site\"\n    }\n}\n";

pub async fn run(args: &InitArgs) -> Result<(), anyhow::Error> {
    let path = if args.path.is_relative() {
        std::env::current_dir()?.join(&args.path)
    } else {
        args.path.clone()
    };

    if !path.exists() {
        if args.create {
            tokio::fs::create_dir_all(&path).await?;
            println!("Created directory {path}", path = path.display());
        } else {
            return Err(anyhow::anyhow!(
                "Directory does not exist: {path}",
                path = path.display()
            ));
        }
    }

    println!("Initializing project in {}", path.display());

    let config_text = serde_yaml::to_string(&Config::default())?;
    tokio::fs::write(path.join("weft.yaml"), config_text).await?;

    for section in ["views", "styles", "scripts", "data"] {
        tokio::fs::create_dir_all(path.join("src").join(section)).await?;
    }

    // The starter page uses the bundled twig engine so it renders without
    // any optional tooling installed.
    tokio::fs::write(path.join("src/views/index.twig"), STARTER_TEMPLATE).await?;
    tokio::fs::write(path.join("src/styles/main.css"), STARTER_STYLE).await?;
    tokio::fs::write(path.join("src/data/site.json"), STARTER_DATA).await?;

    println!(
        "Created config file {config_file}",
        config_file = path.join("weft.yaml").display()
    );

    Ok(())
}
