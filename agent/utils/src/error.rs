use aws_sdk_sts::error::GetCallerIdentityError;
use aws_sdk_sts::types::SdkError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Unable to get the caller identity: {}", source))]
    CallerIdentity {
        source: SdkError<GetCallerIdentityError>,
    },

    #[snafu(display(
        "Error running '{}', exit code {}\nstderr:\n{}\nstdout:\n{}",
        command,
        code,
        stderr,
        stdout
    ))]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
        stdout: String,
    },

    #[snafu(display("{} was missing from {}", what, from))]
    Missing { what: String, from: String },
}

pub type Result<T> = std::result::Result<T, Error>;
