//! Prompt text sent to the chat-completion API.

use crate::domain::model::{ProductRow, Template};
use std::fmt::Write;

pub const LISTING_SYSTEM_PROMPT: &str = "You are a luxury consumer goods industry expert, specializing in high-end fashion and luxury brand product descriptions and market positioning.";

pub const DESCRIPTION_SYSTEM_PROMPT: &str = "You are a luxury fashion expert specializing in high-end product descriptions.
Your responses should be:
1. Professional but accessible
2. Accurate and specific
3. Free of marketing hyperbole
4. Focused on materials, craftsmanship, and design
5. Compliant with EU/UK product description standards";

pub const VERIFICATION_SYSTEM_PROMPT: &str =
    "You are a luxury fashion expert specializing in product verification.";

pub const GENERAL_INSTRUCTIONS: &str = "Use the provided Brand, Product Type, Style number, Additional Information, and Size Information to search for product details and complete the eBay product listing as per the below requirements:

Create Title (Titolo), Subtitle (Sottotitolo), Short Description (Breve Descrizione), and Description (Descrizione).
Find the Mandatory and Optional product information listed under 'Mandatory Fields' and 'Optional Fields'.
IMPORTANT: You MUST use the EXACT field names as provided, including both English and Italian parts. Every field name should be in the format: 'English Name (Italian Name)'. Do not omit or change any part of the field names.
If any fields have no information available on the internet, or you cannot find it, use 'N/A' as the value.
Include detailed size information, including available sizes and fit recommendations.
Fill in as many optional fields as possible, especially technical specifications.
The tone should be professional and follow a minimalist style.

Instructions for the Title (Titolo):
- Brand Name: Include the brand for recognition.
- Product Type: Clearly state what the item is.
- Key Features: Include important features such as model name, color, or material.
- Keep it under 80 characters. The size is appended automatically, do not add it.

Instructions for the Subtitle (Sottotitolo):
- Complementary: It should add value beyond what the main title already says.
- Concise: Keep it short and clear, under 55 characters.

Instructions for the Description (Descrizione):
Create a comprehensive product description using bullet points for better readability, covering:
• Product overview and what makes the product stand out
• Key features (materials, design, proprietary technologies) and how they benefit the buyer
• Size and fit, compared to standard sizing
• Materials and construction
• Intended use and occasions
• Care instructions
• After-sales: warranty information and the 14-day return policy under European regulations
• A closing line encouraging the purchase

Combine these elements into one flowing list of bullet points, without separate headings.";

fn product_block(product: &ProductRow) -> String {
    format!(
        "Brand: {}\nProduct Type: {}\nStyle Number: {}\nAdditional Information: {}\nSize Information: {}\n",
        product.brand,
        product.product_type,
        product.style_number,
        product.additional_info,
        product.size_info
    )
}

/// Single-call prompt asking for headline and template fields in one reply.
pub fn listing_prompt(product: &ProductRow, template: &Template) -> String {
    let mut prompt = product_block(product);
    prompt.push_str(
        "\nPlease generate a detailed eBay listing using the following format:\n\n\
         **Title (Titolo):** [Generate a concise, descriptive title]\n\
         **Subtitle (Sottotitolo):** [Generate a brief, catchy subtitle]\n\
         **Short Description (Breve Descrizione):** [Generate a brief summary of the product, about 2-3 sentences]\n\
         **Description (Descrizione):** [Generate a detailed, multi-paragraph description]\n\n\
         **Mandatory Fields:**",
    );
    for field in &template.mandatory_fields {
        let _ = write!(prompt, "\n**{}:** [Generate appropriate content]", field);
    }
    prompt.push_str("\n\n**Optional Fields:**");
    for field in &template.optional_fields {
        let _ = write!(
            prompt,
            "\n**{}:** [Generate appropriate content if available, or 'N/A' if not applicable]",
            field
        );
    }
    prompt.push_str("\n\n");
    prompt.push_str(GENERAL_INSTRUCTIONS);
    prompt
}

pub fn description_prompt(product: &ProductRow) -> String {
    format!(
        "Generate a detailed product description for {brand} {product_type} with style number {style}.\n\
         Additional Information: {info}\n\
         Size Information: {size}\n\
         Please format your response exactly as follows:\n\n\
         **Title (Titolo):** [Your title here]\n\n\
         **Subtitle (Sottotitolo):** [Your subtitle here]\n\n\
         **Short Description (Breve Descrizione):** [Your brief summary here, about 2-3 sentences]\n\n\
         **Description (Descrizione):**\n\
         [Your multi-line description here]\n\n\
         Use bullet points for better readability in the description.\n\n{rules}",
        brand = product.brand,
        product_type = product.product_type,
        style = product.style_number,
        info = product.additional_info,
        size = product.size_info,
        rules = GENERAL_INSTRUCTIONS,
    )
}

pub fn fields_prompt(product: &ProductRow, template: &Template) -> String {
    format!(
        "For the {brand} {product_type} with style number {style},\n\
         Additional Information: {info}\n\
         Size Information: {size}\n\
         provide information for the following fields. Use 'N/A' if the information is not available or not applicable.\n\n\
         Mandatory Fields:\n{mandatory}\n\n\
         Optional Fields:\n{optional}\n\n\
         Please provide the information in a structured format, with each field on a new line, \
         written exactly as **Field Name:** value using the field names above.",
        brand = product.brand,
        product_type = product.product_type,
        style = product.style_number,
        info = product.additional_info,
        size = product.size_info,
        mandatory = template.mandatory_fields.join(", "),
        optional = template.optional_fields.join(", "),
    )
}

pub fn html_description_prompt(product: &ProductRow) -> String {
    format!(
        "Generate an eBay product description in HTML format for a {brand} {product_type} with style number {style}.\n\
         Additional Information: {info}\n\
         Find the most important or unique feature of this product on the internet and use it to write an appealing description.\n\n\
         Requirements:\n\
         - Use HTML tags for formatting\n\
         - Include a catchy title and subtitle\n\
         - Provide a detailed description focusing on the unique feature\n\
         - Use bullet points for key features\n\
         - End with a call to action",
        brand = product.brand,
        product_type = product.product_type,
        style = product.style_number,
        info = product.additional_info,
    )
}

pub fn verification_prompt(brand: &str, style_number: &str, title: &str, description: &str) -> String {
    format!(
        r#"As a luxury fashion expert, verify this eBay listing:

Brand: {brand}
Style Number: {style_number}

Title: {title}
Description: {description}

Please verify and respond in JSON format only:
{{
    "title_check": {{
        "is_valid": boolean,
        "issues": [list of issues],
        "contains_brand": boolean,
        "appropriate_length": boolean,
        "keyword_optimization": boolean
    }},
    "description_check": {{
        "is_valid": boolean,
        "issues": [list of issues],
        "completeness": boolean,
        "accuracy": boolean,
        "formatting": boolean
    }},
    "suggestions": [list of suggestions]
}}

Check for:
1. Title (80 characters max):
   - Brand name accuracy
   - Key features included
   - SEO optimization

2. Description:
   - Product details accuracy
   - Complete specifications
   - Proper formatting
   - Required policies included"#
    )
}
