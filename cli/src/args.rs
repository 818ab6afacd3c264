use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "B2B payments API - run the server or manage users"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a user directly in the database
    ///
    /// Goes through the same identity store as `POST /users/`, so the email
    /// must be unused and the password is hashed with Argon2.
    CreateUser(CreateUserArgs),
}

#[derive(ClapArgs, Debug)]
pub struct CreateUserArgs {
    #[arg(short, long, help = "Display name of the user")]
    pub name: String,

    #[arg(short, long, help = "Email address, used as the login name")]
    pub email: String,

    #[arg(short, long, help = "Password for the user")]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_user() {
        let args = Args::try_parse_from([
            "payments_api",
            "create-user",
            "--name",
            "Alice",
            "--email",
            "a@x.com",
            "--password",
            "pw1",
        ])
        .unwrap();

        match args.command {
            Some(Commands::CreateUser(user)) => {
                assert_eq!(user.name, "Alice");
                assert_eq!(user.email, "a@x.com");
                assert_eq!(user.password, "pw1");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn no_arguments_means_no_command() {
        let args = Args::try_parse_from(["payments_api"]).unwrap();
        assert!(args.command.is_none());
    }
}
