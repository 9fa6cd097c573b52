use std::future::Future;

/// Message-style service operation: one input struct, one `process` impl.
///
/// Services implement this once per operation they accept, so every
/// operation has a named request type and a typed result.
pub trait Processor<Input> {
    type Output;
    type Error;

    fn process(
        &self,
        input: Input,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}
