use std::{env, fs};

use anyhow::Context;

use pdf_color::{parse_object, resolve_color_space, Dictionary, Object, ObjectStore, Resolve};

const USAGE: &str =
    "usage: pdf-color <descriptor> [component ...] [--resources <dict>] [--objects <file>]";

#[derive(Debug, Default)]
struct Args {
    descriptor: String,
    components: Vec<f32>,

    /// The `ColorSpace` resource dictionary, in PDF syntax
    resources: Option<String>,

    /// A file of `n g obj ... endobj` definitions
    objects: Option<String>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let mut descriptor = None;
        let mut components = Vec::new();
        let mut resources = None;
        let mut objects = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--resources" => resources = Some(args.next().context(USAGE)?),
                "--objects" => objects = Some(args.next().context(USAGE)?),
                "-h" | "--help" => anyhow::bail!(USAGE),
                _ if descriptor.is_none() => descriptor = Some(arg),
                _ => components.push(
                    arg.parse::<f32>()
                        .with_context(|| format!("invalid color component {:?}", arg))?,
                ),
            }
        }

        Ok(Self {
            descriptor: descriptor.context(USAGE)?,
            components,
            resources,
            objects,
        })
    }
}

fn load_resources(source: &str, doc: &mut ObjectStore) -> anyhow::Result<Dictionary> {
    let obj = parse_object(source.as_bytes()).context("invalid resource dictionary")?;

    match doc.resolve(obj)? {
        Object::Dictionary(dict) => Ok(dict),
        found => anyhow::bail!(
            "resources must be a dictionary, found {:?}",
            found.object_type()
        ),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse(env::args().skip(1))?;

    let mut doc = match &args.objects {
        Some(path) => {
            let source = fs::read(path).with_context(|| format!("unable to read {}", path))?;
            ObjectStore::from_source(&source)?
        }
        None => ObjectStore::new(),
    };

    log::debug!("loaded {} indirect objects", doc.len());

    let resources = match &args.resources {
        Some(source) => Some(load_resources(source, &mut doc)?),
        None => None,
    };

    let descriptor =
        parse_object(args.descriptor.as_bytes()).context("invalid color space descriptor")?;

    let space = resolve_color_space(&descriptor, resources.as_ref(), &mut doc)?;

    let rgb = if args.components.is_empty() {
        space.default_color()
    } else {
        space.get_color(&args.components)?
    };

    println!("family: {}", space.family().as_str());
    println!("components: {}", space.component_count());

    match rgb {
        Some(rgb) => println!("color: {}", rgb),
        None => println!("color: undefined"),
    }

    Ok(())
}
