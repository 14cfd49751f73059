//! Prompt rendering for drafting requests.

use std::fmt::Write as _;

use super::GenerationRequest;

/// Renders `request` into the instruction text sent to the provider.
///
/// The first line of the expected completion is `Subject: ...`, followed by
/// an HTML body. Every request field is embedded.
#[must_use]
pub fn build_prompt(request: &GenerationRequest) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str(
        "Write a short, honest and professional email on behalf of the sender described \
         below. The email must be signed with the sender's real name, must not pretend to \
         come from any other person or organization, and must not pressure the recipient.\n\n",
    );

    let _ = writeln!(prompt, "Situation: {}", request.situation);
    let _ = writeln!(prompt, "Link to include: {}", request.target_url);
    let _ = writeln!(
        prompt,
        "Sender: {} <{}>",
        request.sender_name, request.sender_email
    );
    let _ = writeln!(prompt, "About the sender: {}", request.sender_detail);
    let _ = writeln!(
        prompt,
        "Recipient: {} <{}>",
        request.target_name, request.target_email
    );
    let _ = writeln!(prompt, "About the recipient: {}", request.target_detail);

    prompt.push_str(
        "\nFormat the answer as follows. The first line is the subject, written as \
         \"Subject: <subject>\". Everything after the first line is the body as HTML, using \
         <p> paragraphs and an <a> element for the link.\n",
    );

    prompt
}
