use amrwatch_core::error::AmrError;
use serde::Serialize;

pub fn print<T: Serialize + ?Sized>(result: &T) -> Result<(), AmrError> {
    let json = serde_json::to_string_pretty(result)?;
    println!("{json}");
    Ok(())
}
