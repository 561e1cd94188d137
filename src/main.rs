use clap::{Parser, Subcommand};
use roomhub::address::{AddressCheck, AddressResolver};
use roomhub::config::Settings;
use roomhub::rooms::{Amenity, ImagePart, ListingDraft, RoomClient, RoomFilters, RoomStatus, RoomUpdate};
use roomhub::server;
use roomhub::session::TokenStore;
use serde::Serialize;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// roomhub: room rental marketplace toolkit
///
/// Looks up Mexican postal codes, validates listing addresses, serves the
/// address API for the publication form, and talks to the room service.
///
/// Examples:
///   roomhub resolve 97205
///   roomhub municipalities "Yucatán"
///   roomhub validate --postal-code 97205 --state Yucatán --municipality Mérida --neighborhood Centro
///   roomhub serve --port 8080
///   roomhub rooms list --city Mérida --service Wifi
#[derive(Parser)]
#[command(name = "roomhub", version, about, long_about = None)]
struct Cli {
    /// Postal provider base URL (overrides ROOMHUB_POSTAL_BASE_URL).
    #[arg(long, global = true)]
    postal_base_url: Option<String>,

    /// Postal provider access token (overrides ROOMHUB_POSTAL_TOKEN).
    #[arg(long, global = true)]
    postal_token: Option<String>,

    /// Room service base URL (overrides ROOMHUB_ROOMS_BASE_URL).
    #[arg(long, global = true)]
    rooms_base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every state.
    States,
    /// List the municipalities of a state.
    Municipalities { state: String },
    /// List the neighborhoods (colonias) of a municipality.
    Neighborhoods { municipality: String },
    /// Postal codes starting with a fragment (at least 2 characters).
    Search {
        fragment: String,
        #[arg(long, default_value_t = roomhub::address::DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Full provider record for a 5-digit postal code.
    Resolve { code: String },
    /// State, municipality, city and neighborhood options for a postal code.
    Autocomplete { code: String },
    /// Check an address against the provider's record for its postal code.
    Validate {
        #[arg(long)]
        postal_code: String,
        #[arg(long)]
        state: String,
        #[arg(long)]
        municipality: String,
        #[arg(long)]
        neighborhood: String,
        #[arg(long, default_value = "")]
        street: String,
        #[arg(long, default_value = "")]
        number: String,
    },
    /// Serve the address JSON API.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Store the bearer token used for room-service requests.
    Login { token: String },
    /// Forget the stored token.
    Logout,
    /// Room-service operations.
    Rooms {
        #[command(subcommand)]
        command: RoomsCommand,
    },
}

#[derive(Subcommand)]
enum RoomsCommand {
    /// Search rooms.
    List {
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        zone: Option<String>,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        /// Required service; repeat for several.
        #[arg(long = "service", value_parser = parse_amenity)]
        services: Vec<Amenity>,
        #[arg(long)]
        status: Option<RoomStatus>,
        #[arg(long, default_value_t = roomhub::rooms::DEFAULT_PAGE)]
        page: u32,
        #[arg(long, default_value_t = roomhub::rooms::DEFAULT_LIMIT)]
        limit: u32,
    },
    /// Show one room.
    Show { id: String },
    /// Rooms published by a user.
    Mine { user_id: String },
    /// Delete a room.
    Delete { id: String },
    /// Change a room's availability.
    SetStatus { id: String, status: RoomStatus },
    /// Publish a listing from a JSON draft; local images are uploaded afterwards.
    Publish {
        draft: PathBuf,
        #[arg(long)]
        user: String,
    },
    /// Upload image files for a room.
    Upload {
        id: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn parse_amenity(s: &str) -> Result<Amenity, String> {
    let wanted = s.trim().to_lowercase();
    Amenity::ALL
        .into_iter()
        .find(|a| a.as_str().to_lowercase() == wanted || a.label().to_lowercase() == wanted)
        .ok_or_else(|| {
            let names: Vec<_> = Amenity::ALL.iter().map(|a| a.as_str()).collect();
            format!("Unknown service '{}'. Use one of: {}", s, names.join(", "))
        })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roomhub=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut settings = Settings::from_env()?;
    if let Some(url) = cli.postal_base_url {
        settings.postal_base_url = url;
    }
    if let Some(token) = cli.postal_token {
        settings.postal_token = token;
    }
    if let Some(url) = cli.rooms_base_url {
        settings.rooms_base_url = url;
    }

    let resolver = AddressResolver::from_settings(&settings);

    match cli.command {
        Command::States => print_json(&resolver.list_states()),
        Command::Municipalities { state } => print_json(&resolver.list_municipalities(&state)),
        Command::Neighborhoods { municipality } => print_json(&resolver.list_neighborhoods(&municipality)),
        Command::Search { fragment, limit } => {
            print_json(&resolver.search_postal_code_candidates(&fragment, limit))
        }
        Command::Resolve { code } => print_json(&resolver.require_postal_code(&code)?),
        Command::Autocomplete { code } => match resolver.autocomplete_from_postal_code(&code)? {
            Some(auto) => print_json(&auto),
            None => Err(roomhub::address::AddressError::NotFound(code).into()),
        },
        Command::Validate { postal_code, state, municipality, neighborhood, street, number } => {
            let check = AddressCheck { street, number, postal_code, neighborhood, municipality, state };
            let result = resolver.validate_address(&check);
            if !result.valid {
                for error in &result.errors {
                    eprintln!("  \u{26A0}\u{FE0F}  {}", error);
                }
            }
            print_json(&result)
        }
        Command::Serve { host, port } => {
            let host = host.unwrap_or(settings.host);
            let port = port.unwrap_or(settings.port);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::start(&host, port, resolver))?;
            Ok(())
        }
        Command::Login { token } => {
            let store = TokenStore::load_from(settings.token_path);
            store.save(&token)?;
            eprintln!("  Token saved to {}", store.path().display());
            Ok(())
        }
        Command::Logout => {
            TokenStore::load_from(settings.token_path).clear()?;
            eprintln!("  Logged out.");
            Ok(())
        }
        Command::Rooms { command } => run_rooms(command, &RoomClient::from_settings(&settings)),
    }
}

fn run_rooms(command: RoomsCommand, client: &RoomClient) -> Result<(), Box<dyn Error>> {
    match command {
        RoomsCommand::List { city, state, zone, min_price, max_price, services, status, page, limit } => {
            let filters = RoomFilters { city, state, zone, min_price, max_price, services, status };
            print_json(&client.list_rooms(&filters, page, limit)?)
        }
        RoomsCommand::Show { id } => print_json(&client.get_room(&id)?),
        RoomsCommand::Mine { user_id } => print_json(&client.user_rooms(&user_id)?),
        RoomsCommand::Delete { id } => {
            client.delete_room(&id)?;
            eprintln!("  Room {} deleted.", id);
            Ok(())
        }
        RoomsCommand::SetStatus { id, status } => {
            let update = RoomUpdate { status: Some(status), ..RoomUpdate::default() };
            print_json(&client.update_room(&id, &update)?)
        }
        RoomsCommand::Publish { draft, user } => {
            let draft: ListingDraft = serde_json::from_str(&fs::read_to_string(&draft)?)?;
            let payload = draft.to_create_room(&user)?;
            let (_, local) = draft.split_images();
            let parts = local
                .iter()
                .map(|p| ImagePart::from_path(p))
                .collect::<Result<Vec<_>, _>>()?;

            let mut room = client.create_room(&payload)?;
            let uploaded = client.upload_images(&room.id, &parts)?;
            room.details.images.extend(uploaded);
            print_json(&room)
        }
        RoomsCommand::Upload { id, files } => {
            let parts = files
                .iter()
                .map(|p| ImagePart::from_path(p))
                .collect::<Result<Vec<_>, _>>()?;
            print_json(&client.upload_images(&id, &parts)?)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
