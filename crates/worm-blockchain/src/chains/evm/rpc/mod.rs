mod balances;
mod epochs;
mod fees;
