/// Builds the image-model prompt for a drawing. The description is inserted verbatim.
pub fn generate_prompt(description: &str, colors: &[&str]) -> String {
    if colors.is_empty() {
        return format!(
            "Create a purely visual artistic oil painting drawing that reimagines '{description}' in a positive manner. \
             For example, transforming a gloomy cloud into a scene with a rainbow. The image must focus entirely \
             on visual elements without any text, letters, or numbers."
        );
    }

    let color_description = colors.join(", ");
    format!(
        "Create a purely visual artistic oil painting drawing using the colors {color_description}, \
         that reimagines '{description}' in a positive manner. For example, transforming a gloomy cloud \
         into a scene with a rainbow. The image must focus entirely on visual elements without any text, \
         letters, or numbers."
    )
}
