//! Compile-time–checked column identifiers for all tables.

use sea_query::Iden;

#[derive(Iden, Clone, Copy)]
pub enum Users {
    Table,
    Username,
    DisplayName,
    PasswordHash,
    CreatedTime,
}

#[derive(Iden, Clone, Copy)]
pub enum Tokens {
    Table,
    RefreshToken,
    Username,
    DeviceName,
    CreatedTime,
    ExpiryTime,
}

#[derive(Iden, Clone, Copy)]
pub enum Items {
    Table,
    Id,
    Name,
}

#[derive(Iden, Clone, Copy)]
pub enum Ious {
    Table,
    Id,
    Item,
    Giver,
    Receiver,
    ParentRequest,
    ProofOfDebt,
    ProofOfCompletion,
    CreatedTime,
    ClaimedTime,
    IsClaimed,
}

#[derive(Iden, Clone, Copy)]
pub enum Requests {
    Table,
    Id,
    Author,
    CompletedBy,
    ProofOfCompletion,
    Details,
    CreatedTime,
    CompletionTime,
    IsCompleted,
}
